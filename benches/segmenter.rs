use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use reelsplice::audio::{AudioSlicer, WavSlicer, wav};
use reelsplice::timing::{WordTimestamp, plan};
use std::hint::black_box;

/// Synthetic narration: ~0.4s words with a pause and full stop every 12 words.
fn narration(words: usize) -> Vec<WordTimestamp> {
    let mut cursor = 0.0;
    (0..words)
        .map(|i| {
            let sentence_end = i % 12 == 11;
            let start = cursor;
            let end = start + 0.25 + (i % 5) as f64 * 0.05;
            cursor = if sentence_end { end + 0.5 } else { end };
            let word = if sentence_end {
                format!("word{i}.")
            } else {
                format!("word{i}")
            };
            WordTimestamp::new(word, start, end)
        })
        .collect()
}

fn plan_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("plan");
    for words in [50usize, 500, 5_000] {
        let timestamps = narration(words);
        group.bench_with_input(
            BenchmarkId::from_parameter(words),
            &timestamps,
            |b, timestamps| {
                b.iter(|| plan(black_box(timestamps), black_box(10.0)));
            },
        );
    }
    group.finish();
}

fn slice_benchmark(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().expect("Failed to build runtime");
    let timestamps = narration(500);
    let total = timestamps.last().map_or(0.0, |w| w.end);
    // 16 kHz mono covering the whole narration.
    let frames = (total * 16_000.0) as usize;
    let container =
        wav::wrap(&vec![0u8; frames * 2], 16_000, 1, 16).expect("Failed to wrap narration");
    let cuts = plan(&timestamps, 10.0)
        .expect("Failed to plan")
        .normalized(wav::duration(&container).expect("Failed to read duration"));
    let workdir = tempfile::tempdir().expect("Failed to create workdir");

    c.bench_function("native_slice_500_words", |b| {
        b.iter(|| {
            runtime
                .block_on(WavSlicer::new().slice(black_box(&container), &cuts, workdir.path()))
                .expect("Slicing failed")
        });
    });
}

criterion_group!(benches, plan_benchmark, slice_benchmark);
criterion_main!(benches);
