use std::hint::black_box;

use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use image::{DynamicImage, Rgba, RgbaImage};
use imstash::config::StoreOptions;
use imstash::{ImageStore, PublicDir};
use tempfile::TempDir;

fn benchmark_store(c: &mut Criterion) {
    let dir = TempDir::new().unwrap();
    let store = ImageStore::open(&PublicDir::new(dir.path()), &StoreOptions::default()).unwrap();

    let rgb = DynamicImage::new_rgb8(1024, 768);
    let rgba = DynamicImage::ImageRgba8(RgbaImage::from_pixel(1024, 768, Rgba([10, 20, 30, 255])));
    let upload = vec![0u8; 4 * 1024 * 1024];

    let mut group = c.benchmark_group("结果图片");
    group.throughput(Throughput::Elements(1));
    group.bench_function("RGB 编码写入", |b| b.iter(|| store.write_result(black_box(&rgb)).unwrap()));
    group.bench_function("RGBA 编码写入", |b| b.iter(|| store.write_result(black_box(&rgba)).unwrap()));
    group.finish();

    let mut group = c.benchmark_group("上传图片");
    group.throughput(Throughput::Bytes(upload.len() as u64));
    group.bench_function("保存 4MiB", |b| {
        b.iter(|| store.persist(black_box(&upload[..]), "bench.png").unwrap())
    });
    group.finish();
}

criterion_group!(benches, benchmark_store);
criterion_main!(benches);
