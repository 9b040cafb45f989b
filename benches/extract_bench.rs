//! vidres 分辨率提取性能基准测试.
//!
//! 覆盖起始码分割, 防竞争字节移除, 以及 SPS 位于大段切片数据之后的提取路径.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use vidres::codec::parsers::{find_nal_ranges, remove_emulation_prevention};
use vidres::codec::{CodecId, ExtractOptions, detect_codec, extract_resolution};

/// Baseline CIF SPS (含 4 字节起始码)
const CIF_SPS: &[u8] = &[
    0x00, 0x00, 0x00, 0x01, 0x67, 0x42, 0xC0, 0x1E, 0xF4, 0x0B, 0x04, 0xB2,
];

/// 构造 `slices` 个切片后接 SPS 的码流, 每个切片含若干防竞争字节
fn build_stream(slices: usize, slice_len: usize) -> Vec<u8> {
    let mut data = Vec::with_capacity(slices * (slice_len + 4) + CIF_SPS.len());
    for i in 0..slices {
        data.extend_from_slice(&[0x00, 0x00, 0x01, 0x41]);
        data.extend((0..slice_len).map(|j| match j % 64 {
            10 | 11 => 0x00,
            12 => 0x03,
            _ => ((i + j) % 251) as u8 | 0x10,
        }));
    }
    data.extend_from_slice(CIF_SPS);
    data
}

fn bench_find_nal_ranges(c: &mut Criterion) {
    let data = build_stream(256, 4096);
    c.bench_function("find_nal_ranges_1mb", |b| {
        b.iter(|| black_box(find_nal_ranges(black_box(&data))));
    });
}

fn bench_remove_emulation_prevention(c: &mut Criterion) {
    let data = build_stream(1, 1 << 20);
    c.bench_function("remove_emulation_prevention_1mb", |b| {
        b.iter(|| black_box(remove_emulation_prevention(black_box(&data))));
    });
}

fn bench_extract_resolution(c: &mut Criterion) {
    let opts = ExtractOptions::default();

    let head = build_stream(0, 0);
    c.bench_function("extract_h264_sps_only", |b| {
        b.iter(|| extract_resolution(CodecId::H264, black_box(&head), &opts).unwrap());
    });

    let tail = build_stream(256, 4096);
    c.bench_function("extract_h264_sps_after_1mb", |b| {
        b.iter(|| extract_resolution(CodecId::H264, black_box(&tail), &opts).unwrap());
    });
}

fn bench_detect_codec(c: &mut Criterion) {
    let data = build_stream(256, 4096);
    c.bench_function("detect_codec_1mb", |b| {
        b.iter(|| black_box(detect_codec(black_box(&data))));
    });
}

criterion_group!(
    benches,
    bench_find_nal_ranges,
    bench_remove_emulation_prevention,
    bench_extract_resolution,
    bench_detect_codec,
);
criterion_main!(benches);
