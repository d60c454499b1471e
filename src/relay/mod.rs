//! Authenticated pass-through relay for the video vendor API.
//!
//! Callers send requests with the real destination in a target header. The
//! relay checks the destination host against an allow-list before any
//! outbound traffic, attaches the server-side API key, forwards only the
//! vendor's own headers and hands the upstream status and body back unchanged.

use crate::config::{Credentials, RelayConfig};
use crate::defaults::RELAY_HEADER_PREFIX;
use crate::error::{ReelError, Result};
use async_trait::async_trait;
use axum::Router;
use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use regex::Regex;
use serde_json::json;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Route the relay answers on.
pub const PROXY_PATH: &str = "/api/fal/proxy";

/// Validated relay settings.
#[derive(Debug, Clone)]
pub struct RelaySettings {
    pub target_header: HeaderName,
    pub allowed_host: Regex,
    pub timeout: Duration,
}

impl RelaySettings {
    pub fn from_config(config: &RelayConfig) -> Result<Self> {
        let target_header = HeaderName::try_from(config.target_header.as_str()).map_err(|e| {
            ReelError::ConfigInvalidValue {
                key: "relay.target_header".to_string(),
                message: e.to_string(),
            }
        })?;
        let allowed_host =
            Regex::new(&config.allowed_host_pattern).map_err(|e| ReelError::ConfigInvalidValue {
                key: "relay.allowed_host_pattern".to_string(),
                message: e.to_string(),
            })?;
        Ok(Self {
            target_header,
            allowed_host,
            timeout: Duration::from_secs(config.timeout_secs),
        })
    }
}

/// Why a request was refused before reaching the upstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayRejection {
    MissingTarget,
    MalformedTarget,
    HostNotAllowed { host: String },
    MissingCredential,
}

impl RelayRejection {
    pub fn status(&self) -> StatusCode {
        match self {
            RelayRejection::MissingTarget | RelayRejection::MalformedTarget => {
                StatusCode::BAD_REQUEST
            }
            RelayRejection::HostNotAllowed { .. } => StatusCode::PRECONDITION_FAILED,
            RelayRejection::MissingCredential => StatusCode::UNAUTHORIZED,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            RelayRejection::MissingTarget => "Missing x-fal-target-url header",
            RelayRejection::MalformedTarget => "Invalid target URL format",
            RelayRejection::HostNotAllowed { .. } => "Invalid target URL",
            RelayRejection::MissingCredential => "Missing Fal credentials",
        }
    }
}

impl IntoResponse for RelayRejection {
    fn into_response(self) -> Response {
        json_error(self.status(), self.message())
    }
}

fn json_error(status: StatusCode, message: &str) -> Response {
    (status, axum::Json(json!({ "error": message }))).into_response()
}

/// Read and check the forwarding target.
///
/// The allow-list is matched against the URL's host, including the port when
/// one is given explicitly.
pub fn validate_target(
    headers: &HeaderMap,
    settings: &RelaySettings,
) -> std::result::Result<reqwest::Url, RelayRejection> {
    let raw = headers
        .get(&settings.target_header)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .ok_or(RelayRejection::MissingTarget)?;

    let url = reqwest::Url::parse(raw).map_err(|_| RelayRejection::MalformedTarget)?;
    let host = match (url.host_str(), url.port()) {
        (Some(host), Some(port)) => format!("{host}:{port}"),
        (Some(host), None) => host.to_string(),
        (None, _) => return Err(RelayRejection::MalformedTarget),
    };

    if !settings.allowed_host.is_match(&host) {
        return Err(RelayRejection::HostNotAllowed { host });
    }
    Ok(url)
}

/// Headers sent upstream: the caller's vendor headers plus auth and JSON
/// content negotiation.
pub fn forward_headers(incoming: &HeaderMap, api_key: &str) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    for (name, value) in incoming {
        if name.as_str().starts_with(RELAY_HEADER_PREFIX) {
            headers.insert(name.clone(), value.clone());
        }
    }
    let auth = HeaderValue::from_str(&format!("Key {api_key}"))
        .map_err(|e| ReelError::input(format!("API key is not a valid header value: {e}")))?;
    headers.insert(header::AUTHORIZATION, auth);
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
    Ok(headers)
}

/// One request on its way to the upstream.
#[derive(Debug, Clone)]
pub struct ForwardRequest {
    pub method: Method,
    pub url: reqwest::Url,
    pub headers: HeaderMap,
    /// `None` for GET.
    pub body: Option<Bytes>,
}

/// Upstream answer, passed back verbatim.
pub struct ForwardResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    /// Streamed through as it arrives.
    pub body: Body,
}

impl fmt::Debug for ForwardResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForwardResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

/// Where the relay sends validated requests.
#[async_trait]
pub trait Upstream: Send + Sync {
    async fn forward(&self, request: ForwardRequest) -> Result<ForwardResponse>;
}

#[async_trait]
impl<T: Upstream + ?Sized> Upstream for Arc<T> {
    async fn forward(&self, request: ForwardRequest) -> Result<ForwardResponse> {
        (**self).forward(request).await
    }
}

/// reqwest-backed upstream.
#[derive(Debug, Clone)]
pub struct HttpUpstream {
    client: reqwest::Client,
}

impl HttpUpstream {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Upstream for HttpUpstream {
    async fn forward(&self, request: ForwardRequest) -> Result<ForwardResponse> {
        let mut builder = self
            .client
            .request(request.method, request.url)
            .headers(request.headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }
        let response = builder.send().await?;

        let status = response.status();
        let mut headers = response.headers().clone();
        // Framing is recomputed for the downstream response.
        for hop in [header::TRANSFER_ENCODING, header::CONNECTION, header::CONTENT_LENGTH] {
            headers.remove(hop);
        }
        Ok(ForwardResponse {
            status,
            headers,
            body: Body::from_stream(response.bytes_stream()),
        })
    }
}

/// Relay service state.
pub struct Relay {
    settings: RelaySettings,
    credentials: Credentials,
    upstream: Arc<dyn Upstream>,
}

impl Relay {
    pub fn new(settings: RelaySettings, credentials: Credentials, upstream: Arc<dyn Upstream>) -> Self {
        Self {
            settings,
            credentials,
            upstream,
        }
    }

    /// Validate, authenticate and forward one request.
    pub async fn handle(&self, method: Method, headers: &HeaderMap, body: Bytes) -> Response {
        let url = match validate_target(headers, &self.settings) {
            Ok(url) => url,
            Err(rejection) => {
                tracing::warn!(reason = rejection.message(), ?rejection, "relay request rejected");
                return rejection.into_response();
            }
        };

        let Ok(api_key) = self.credentials.video_api_key() else {
            tracing::error!("relay has no video API key configured");
            return RelayRejection::MissingCredential.into_response();
        };

        let forwarded_headers = match forward_headers(headers, api_key) {
            Ok(h) => h,
            Err(e) => return json_error(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()),
        };

        let body = (method != Method::GET).then_some(body);
        tracing::debug!(%method, target = %url, "relaying request");

        let request = ForwardRequest {
            method,
            url,
            headers: forwarded_headers,
            body,
        };
        match self.upstream.forward(request).await {
            Ok(upstream) => {
                if !upstream.status.is_success() {
                    tracing::warn!(status = %upstream.status, "upstream returned an error status");
                }
                let mut response = Response::new(upstream.body);
                *response.status_mut() = upstream.status;
                *response.headers_mut() = upstream.headers;
                response
            }
            Err(e) => {
                tracing::error!(error = %e, "relay upstream request failed");
                json_error(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string())
            }
        }
    }
}

async fn proxy(
    State(relay): State<Arc<Relay>>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    relay.handle(method, &headers, body).await
}

/// Router exposing the relay on [`PROXY_PATH`] for GET and POST.
pub fn router(relay: Relay) -> Router {
    Router::new()
        .route(PROXY_PATH, get(proxy).post(proxy))
        .with_state(Arc::new(relay))
}

/// Bind `listen` and serve until the task is cancelled.
pub async fn serve(listen: &str, relay: Relay) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(listen).await?;
    tracing::info!(addr = %listener.local_addr()?, path = PROXY_PATH, "relay listening");
    axum::serve(listener, router(relay)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> RelaySettings {
        RelaySettings::from_config(&RelayConfig::default()).unwrap()
    }

    fn with_target(url: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("x-fal-target-url", HeaderValue::from_str(url).unwrap());
        headers
    }

    #[test]
    fn missing_target_is_bad_request() {
        let err = validate_target(&HeaderMap::new(), &settings()).unwrap_err();
        assert_eq!(err, RelayRejection::MissingTarget);
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn malformed_target_is_bad_request() {
        let err = validate_target(&with_target("not a url"), &settings()).unwrap_err();
        assert_eq!(err, RelayRejection::MalformedTarget);
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn allowed_hosts_pass() {
        for url in [
            "https://fal.run/fal-ai/wan",
            "https://queue.fal.run/fal-ai/wan/requests/1",
            "https://rest.alpha.fal.ai/storage/upload",
            "https://fal.ai/",
        ] {
            assert!(validate_target(&with_target(url), &settings()).is_ok(), "{url}");
        }
    }

    #[test]
    fn foreign_hosts_are_precondition_failed() {
        for url in [
            "https://example.com/x",
            "https://fal.run.evil.com/x",
            "https://notfal.run/x",
            "https://fal.run:8443/x",
        ] {
            let err = validate_target(&with_target(url), &settings()).unwrap_err();
            assert!(
                matches!(err, RelayRejection::HostNotAllowed { .. }),
                "{url} gave {err:?}"
            );
            assert_eq!(err.status(), StatusCode::PRECONDITION_FAILED);
        }
    }

    #[test]
    fn forward_headers_keeps_only_vendor_headers() {
        let mut incoming = with_target("https://fal.run/x");
        incoming.insert("x-fal-queue-priority", HeaderValue::from_static("low"));
        incoming.insert("cookie", HeaderValue::from_static("session=1"));
        incoming.insert("authorization", HeaderValue::from_static("Bearer client"));

        let headers = forward_headers(&incoming, "k123").unwrap();

        assert_eq!(headers["authorization"], "Key k123");
        assert_eq!(headers["content-type"], "application/json");
        assert_eq!(headers["accept"], "application/json");
        assert_eq!(headers["x-fal-queue-priority"], "low");
        assert!(headers.contains_key("x-fal-target-url"));
        assert!(!headers.contains_key("cookie"));
    }

    #[test]
    fn settings_reject_bad_pattern() {
        let config = RelayConfig {
            allowed_host_pattern: "(".to_string(),
            ..RelayConfig::default()
        };
        assert!(RelaySettings::from_config(&config).is_err());
    }
}
