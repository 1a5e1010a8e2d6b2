use criterion::{black_box, criterion_group, criterion_main, Criterion};

use cqlsession::transport::fingerprint::Fingerprint;
use cqlsession::transport::host::HostRegistry;
use cqlsession::transport::load_balancing::{LoadBalancer, RoundRobinPolicy};

fn fingerprint_benchmark(c: &mut Criterion) {
    let frame = b"PREPARE SELECT * FROM ks.t WHERE a = ? AND b = ?".repeat(4);
    c.bench_function("fingerprint of_encoded_prepare", |b| {
        b.iter(|| Fingerprint::of_encoded_prepare(black_box(&frame)))
    });
}

fn round_robin_select_benchmark(c: &mut Criterion) {
    let registry = HostRegistry::new();
    let balancer = RoundRobinPolicy::new();
    c.bench_function("round robin select over empty registry", |b| {
        b.iter(|| balancer.select(black_box(&registry), None))
    });
}

criterion_group!(benches, fingerprint_benchmark, round_robin_select_benchmark);
criterion_main!(benches);
