//! Capture hot path: resample one block and encode it for the wire

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use voicelink::audio::buffer::AudioFrame;
use voicelink::audio::capture::encode_frame;
use voicelink::audio::resample::{interpolate_linear, resample};
use voicelink::codec::pcm16;

fn sine_block(len: usize, rate: u32) -> Vec<f32> {
    (0..len)
        .map(|i| (2.0 * std::f32::consts::PI * 440.0 * i as f32 / rate as f32).sin() * 0.5)
        .collect()
}

fn benchmark_resample(c: &mut Criterion) {
    let mut group = c.benchmark_group("resample");

    for &rate in &[16_000u32, 44_100, 48_000] {
        let block = sine_block(4096, rate);
        group.bench_with_input(BenchmarkId::new("to_16k", rate), &block, |b, block| {
            b.iter(|| resample(black_box(block), rate, 16_000));
        });
    }

    let wire = sine_block(1600, 16_000);
    group.bench_function("interpolate_16k_to_48k", |b| {
        b.iter(|| interpolate_linear(black_box(&wire), 16_000, 48_000));
    });

    group.finish();
}

fn benchmark_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("pcm16");

    let samples = sine_block(4096, 16_000);
    group.bench_function("encode_4096", |b| {
        b.iter(|| pcm16::encode(black_box(&samples)));
    });

    let bytes = pcm16::encode(&samples);
    group.bench_function("decode_4096", |b| {
        b.iter(|| pcm16::decode(black_box(&bytes)));
    });

    let frame = AudioFrame::mono(sine_block(4096, 48_000), 48_000);
    group.bench_function("encode_frame_48k", |b| {
        b.iter(|| encode_frame(black_box(&frame), 16_000));
    });

    group.finish();
}

criterion_group!(benches, benchmark_resample, benchmark_encode);
criterion_main!(benches);
