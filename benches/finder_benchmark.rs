//! Performance benchmarks for TreeFind
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;
use treefind::core::BoundedItemQueue;
use treefind::{DirectoryFinder, FileFinder, TraversalOrder};

/// Build `width` directories per level, `depth` levels deep, with `files` files in each
fn create_test_tree(root: &Path, width: usize, depth: usize, files: usize) -> usize {
    let mut created = 0;
    for i in 0..width {
        let dir = root.join(format!("dir_{}", i));
        std::fs::create_dir(&dir).unwrap();
        for f in 0..files {
            std::fs::write(dir.join(format!("file_{}.txt", f)), b"data").unwrap();
        }
        created += 1;
        if depth > 1 {
            created += create_test_tree(&dir, width, depth - 1, files);
        }
    }
    created
}

fn bench_directory_finder(c: &mut Criterion) {
    let root = TempDir::new().unwrap();
    let dirs = create_test_tree(root.path(), 6, 3, 0);

    let mut group = c.benchmark_group("directory_finder");
    group.throughput(Throughput::Elements(dirs as u64));

    for order in [TraversalOrder::RootFirst, TraversalOrder::DeepestFirst] {
        group.bench_with_input(BenchmarkId::new("order", format!("{:?}", order)), &order, |b, order| {
            b.iter(|| {
                let finder = DirectoryFinder::builder(root.path()).order(*order).start().unwrap();
                black_box(finder.iter().count())
            });
        });
    }

    group.finish();
}

fn bench_file_finder_capacity(c: &mut Criterion) {
    let root = TempDir::new().unwrap();
    let dirs = create_test_tree(root.path(), 4, 3, 20);

    let mut group = c.benchmark_group("file_finder_capacity");
    group.throughput(Throughput::Elements((dirs * 20) as u64));

    for capacity in [1usize, 16, 256, 0] {
        group.bench_with_input(BenchmarkId::from_parameter(capacity), &capacity, |b, &capacity| {
            b.iter(|| {
                let finder = FileFinder::builder(root.path())
                    .directory_capacity(capacity)
                    .file_capacity(capacity)
                    .start()
                    .unwrap();
                black_box(finder.iter().count())
            });
        });
    }

    group.finish();
}

fn bench_file_finder_mask(c: &mut Criterion) {
    let root = TempDir::new().unwrap();
    create_test_tree(root.path(), 4, 3, 20);

    c.bench_function("file_finder_mask", |b| {
        b.iter(|| {
            let finder = FileFinder::builder(root.path())
                .file_mask("file_1*.txt;file_2.txt")
                .start()
                .unwrap();
            black_box(finder.get(true, 0).len() + finder.iter().count())
        });
    });
}

fn bench_queue_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("queue_throughput");
    let items = 10_000u64;
    group.throughput(Throughput::Elements(items));

    for capacity in [1usize, 64, 1024] {
        group.bench_with_input(BenchmarkId::from_parameter(capacity), &capacity, |b, &capacity| {
            b.iter(|| {
                let (producer, queue) = BoundedItemQueue::new(capacity, Duration::from_millis(10));
                let handle = std::thread::spawn(move || {
                    for i in 0..items {
                        producer.enqueue(i).unwrap();
                    }
                });
                let mut sum = 0u64;
                while let Some(i) = queue.wait_next(None) {
                    sum += i;
                }
                handle.join().unwrap();
                black_box(sum)
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_directory_finder,
    bench_file_finder_capacity,
    bench_file_finder_mask,
    bench_queue_throughput,
);

criterion_main!(benches);
