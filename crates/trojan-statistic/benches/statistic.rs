//! Benchmarks for user lookup, admission and traffic metering.

use std::hint::black_box;
use std::time::Duration;

use async_trait::async_trait;
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use trojan_statistic::store::{StoreAuth, UserRecord, UserScan, UserStore};
use trojan_statistic::{AuthError, Authenticator, User, UserCache, is_admitted, sha224_hex};

/// Store that never has anything; every cache miss is rejected.
struct EmptyStore;

#[async_trait]
impl UserStore for EmptyStore {
    async fn add_traffic(&self, _hash: &str, _upload: u64, _download: u64) -> Result<u64, AuthError> {
        Ok(0)
    }

    async fn load_users(&self) -> Result<UserScan, AuthError> {
        Ok(UserScan::default())
    }

    async fn find_by_hash(&self, _hash: &str) -> Result<Option<UserRecord>, AuthError> {
        Ok(None)
    }
}

fn hashes(n: usize) -> Vec<String> {
    (0..n).map(|i| sha224_hex(&format!("password_{i}"))).collect()
}

fn bench_cache_lookup(c: &mut Criterion) {
    let miss = sha224_hex("nonexistent_password");

    let mut group = c.benchmark_group("cache_lookup");
    for n in [10usize, 100, 1000] {
        let hashes = hashes(n);
        let cache = UserCache::from_hashes(hashes.iter().cloned());
        let hit = hashes[n / 2].clone();

        group.bench_with_input(BenchmarkId::new("hit", n), &hit, |b, h| {
            b.iter(|| cache.lookup(black_box(h)))
        });
        group.bench_with_input(BenchmarkId::new("miss", n), &miss, |b, h| {
            b.iter(|| cache.lookup(black_box(h)))
        });
    }
    group.finish();
}

fn bench_store_authorize(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let auth = StoreAuth::new(EmptyStore, Duration::from_secs(60));
    let hashes = hashes(1000);
    for h in &hashes {
        auth.cache().add_user(h);
    }
    let hit = hashes[500].clone();
    let miss = sha224_hex("nonexistent_password");

    let mut group = c.benchmark_group("store_authorize");
    group.bench_function("cache_hit", |b| {
        b.iter(|| rt.block_on(auth.authorize(black_box(&hit))))
    });
    group.bench_function("fallback_miss", |b| {
        b.iter(|| rt.block_on(auth.authorize(black_box(&miss))))
    });
    group.finish();
}

fn bench_is_admitted(c: &mut Criterion) {
    c.bench_function("is_admitted", |b| {
        b.iter(|| is_admitted(black_box(1 << 30), black_box(1 << 20), black_box(1 << 21)))
    });
}

fn bench_traffic(c: &mut Criterion) {
    let user = User::new(sha224_hex("password"));

    c.bench_function("add_traffic", |b| {
        b.iter(|| user.add_traffic(black_box(1500), black_box(40)))
    });

    c.bench_function("add_then_reset_traffic", |b| {
        b.iter(|| {
            user.add_traffic(black_box(1500), black_box(40));
            black_box(user.reset_traffic())
        })
    });
}

criterion_group!(
    benches,
    bench_cache_lookup,
    bench_store_authorize,
    bench_is_admitted,
    bench_traffic,
);
criterion_main!(benches);
