//! Benchmarks for host routing.

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

use pacserve::pac::Router;
use pacserve::rules::merge_tiers;

fn generate_domains(prefix: &str, size: usize) -> Vec<String> {
    (0..size).map(|i| format!("{prefix}{i}.com")).collect()
}

fn bench_route(c: &mut Criterion) {
    let mut group = c.benchmark_group("router_route");

    for size in &[10, 100, 1000, 10000] {
        let proxy = generate_domains("proxied", *size);
        let direct = generate_domains("direct", *size / 10);
        let router = Router::new(&merge_tiers([&proxy], [&direct]));

        // Exact proxy-table hit
        group.bench_with_input(
            BenchmarkId::new("exact_hit", size),
            &(&router, "proxied0.com"),
            |b, (router, host)| {
                b.iter(|| router.route(black_box(host)));
            },
        );

        // Parent-domain hit after stripping labels
        group.bench_with_input(
            BenchmarkId::new("suffix_hit", size),
            &(&router, "a.b.c.proxied1.com"),
            |b, (router, host)| {
                b.iter(|| router.route(black_box(host)));
            },
        );

        // Miss: every suffix is checked in both tables
        group.bench_with_input(
            BenchmarkId::new("miss", size),
            &(&router, "www.unlisted.example.org"),
            |b, (router, host)| {
                b.iter(|| router.route(black_box(host)));
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_route);
criterion_main!(benches);
