use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use simcache::cache::{Cache, GenericCache, Operation};
use simcache::config::{CacheConfig, ReplacementPolicyConfig, WriteMissPolicy, WritePolicy};

/// A fixed pseudo-random access pattern, so every policy sees the same addresses
fn access_pattern(length: usize) -> Vec<(Operation, u64)> {
    let mut state: u64 = 0x9E37_79B9_7F4A_7C15;
    (0..length)
        .map(|_| {
            // xorshift, keeps the bench free of I/O and trace parsing
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            let operation = if state % 4 == 0 {
                Operation::Write
            } else {
                Operation::Read
            };
            (operation, state % (1 << 20))
        })
        .collect()
}

pub fn criterion_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("access");
    let pattern = access_pattern(100_000);

    for policy in [
        ReplacementPolicyConfig::Lru,
        ReplacementPolicyConfig::Fifo,
        ReplacementPolicyConfig::Random,
    ] {
        let config = CacheConfig {
            cache_size: 32 * 1024,
            block_size: 64,
            associativity: 8,
            replacement_policy: policy,
            write_policy: WritePolicy::WriteBack,
            write_miss_policy: WriteMissPolicy::WriteAllocate,
        };
        group.bench_with_input(
            BenchmarkId::new("policy", format!("{policy:?}")),
            &config,
            |bench, config| {
                bench.iter(|| {
                    let mut cache = GenericCache::from_config(config).unwrap();
                    for &(operation, address) in &pattern {
                        cache.access(address, operation);
                    }
                    cache.statistics()
                });
            },
        );
    }
    group.finish();
}

criterion_group!(
    name = benches;
    config = Criterion::default().significance_level(0.1).sample_size(10);
    targets = criterion_benchmark
);
criterion_main!(benches);
