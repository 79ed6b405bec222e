#[macro_use]
extern crate criterion;

use criterion::Criterion;

use mockreactor_core::queue::TaskQueue;

fn bench_task_queue_insert_drain(c: &mut Criterion) {
    let mut group = c.benchmark_group("task_queue_throughput");

    for pending in [16u64, 256, 4096] {
        group.throughput(criterion::Throughput::Elements(pending));
        group.bench_function(format!("pending_{}", pending), |b| {
            b.iter(|| {
                let mut queue = TaskQueue::new();
                // Reverse order forces every insert to the front.
                for fire_at in (0..pending).rev() {
                    queue.add_task(fire_at, fire_at);
                }
                let drained = queue.pop_due(pending);
                assert_eq!(drained.len() as u64, pending);
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_task_queue_insert_drain);
criterion_main!(benches);
