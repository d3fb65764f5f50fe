//! Allocation and collection throughput benchmarks.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use shi_core::{Heap, HeapConfig, Scope, ValRef};

fn bench_alloc(c: &mut Criterion) {
    c.bench_function("alloc_ints", |b| {
        let mut heap = Heap::new(HeapConfig::default());
        b.iter(|| {
            for i in 0..1_000 {
                black_box(heap.make_int(i).unwrap());
            }
        });
    });
}

fn bench_collect_live_list(c: &mut Criterion) {
    c.bench_function("collect_10k_live_cells", |b| {
        let mut heap = Heap::new(HeapConfig::default());
        let mut s = Scope::new(&mut heap);
        let list = s.slot(ValRef::NIL);
        for i in 0..10_000 {
            let n = s.make_int(i).unwrap();
            let n = s.slot(n);
            let cell = s.cons(n, list).unwrap();
            s.store(list, cell);
        }
        b.iter(|| {
            s.heap_mut().collect();
            black_box(s.load(list));
        });
    });
}

criterion_group!(benches, bench_alloc, bench_collect_live_list);
criterion_main!(benches);
