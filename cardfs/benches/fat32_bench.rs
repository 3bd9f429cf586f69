use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use cardfs::fat32::*;

#[path = "../tests/common/mod.rs"]
mod common;
use common::*;

criterion_group!(benches, fat32_decode_bench, fat32_volume_bench);
criterion_main!(benches);

fn directory_region() -> Vec<u8> {
    let mut region = Vec::new();
    for i in 0..128u32 {
        let mut short = *b"ENTRY   BIN";
        short[5..8].copy_from_slice(format!("{:03}", i % 1000).as_bytes());
        let long = format!("a rather long file name number {i}.bin");
        for slot in long_slots(&long, &short) {
            region.extend_from_slice(&slot);
        }
        region.extend_from_slice(&short_slot(&short, 0x20, i + 3, 1000));
    }
    region.extend_from_slice(&[0u8; 32]);
    region
}

pub fn fat32_decode_bench(c: &mut Criterion) {
    let region = directory_region();

    c.bench_function("fat32_decode_directory", |b| {
        b.iter(|| decode_directory(black_box(&region)).count());
    });
}

pub fn fat32_volume_bench(c: &mut Criterion) {
    let data = pattern(40 * SECTOR, 3);
    let mut builder = ImageBuilder::new(b"BENCHFS    ");
    builder.add_file_with_stride(ROOT, b"DATA    BIN", Some("data.bin"), &data, 2);
    let image = builder.build();

    let mut session = session(image.clone());
    c.bench_function("card_read_bytes_unaligned", |b| {
        b.iter(|| {
            let mut out = [0u8; 3000];
            session.read_bytes(&mut out, black_box(PART_LBA as u64 * 512 + 77)).expect("read failed");
            out
        });
    });

    let mut volume = mount(image);
    c.bench_function("fat32_read_file_fragmented", |b| {
        b.iter(|| volume.read_file_path(black_box("data.bin")).expect("read failed"));
    });
}
