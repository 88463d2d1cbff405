use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::fs;
use std::path::Path;
use tempfile::TempDir;
use tokio::runtime::Runtime;
use treecp::{copy, CopyOptions};

const DIRS: usize = 8;
const FILES_PER_DIR: usize = 32;
const FILE_SIZE: usize = 4 * 1024;

/// Build a two-level tree of `DIRS` directories holding `FILES_PER_DIR` files each.
fn create_tree(root: &Path) {
    let data: Vec<u8> = (0..FILE_SIZE).map(|i| (i % 256) as u8).collect();
    for d in 0..DIRS {
        let dir = root.join(format!("dir{:02}", d)).join("inner");
        fs::create_dir_all(&dir).expect("Failed to create bench dir");
        for f in 0..FILES_PER_DIR {
            fs::write(dir.join(format!("file{:03}.bin", f)), &data)
                .expect("Failed to write bench file");
        }
    }
}

/// Same tree copied under different concurrency limits
fn bench_copy_limits(c: &mut Criterion) {
    let rt = Runtime::new().expect("Failed to build runtime");
    let source = TempDir::new().expect("Failed to create temp dir");
    create_tree(source.path());

    let mut group = c.benchmark_group("copy_tree_limit");
    group.throughput(Throughput::Bytes((DIRS * FILES_PER_DIR * FILE_SIZE) as u64));
    group.sample_size(20);

    for limit in [1usize, 4, 16, 64] {
        group.bench_with_input(BenchmarkId::from_parameter(limit), &limit, |b, &limit| {
            b.iter(|| {
                let out = TempDir::new().expect("Failed to create temp dir");
                let options = CopyOptions::default().with_limit(limit);
                let stats = rt
                    .block_on(copy(source.path(), out.path().join("copy"), options))
                    .expect("bench copy should succeed");
                black_box(stats)
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_copy_limits);
criterion_main!(benches);
