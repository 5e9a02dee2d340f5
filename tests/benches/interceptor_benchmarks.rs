//! # Storage Core Benchmarks
//!
//! | Area | Measured |
//! |------|----------|
//! | Chain registration | Ordering N providers with random anchors |
//! | Chain composition | Instantiate and compose one call's AroundTx chain |
//! | Intercepted create | Full façade create over the in-memory store |
//! | Decorated create | Create through the default decorator stack |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::Rng;
use shared_types::{ObjectType, Repository, RequestContext};
use sm_01_interceptors::{
    create_around_tx, CreateAroundTxFn, CreateInterceptor, CreateInterceptorProvider,
    HookShape, InterceptorRegistry, Named,
};
use sm_02_storage::{InMemoryRepository, InterceptableTransactionalRepository};
use sm_runtime::{ServiceContainer, ServiceManagerConfig};
use sm_tests::fixtures::{broker, instance};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;

const CHAIN_SIZES: [usize; 4] = [1, 4, 16, 64];

/// Provider whose AroundTx hook counts calls.
struct Counting {
    name: String,
    calls: Arc<AtomicU64>,
}

impl Named for Counting {
    fn name(&self) -> String {
        self.name.clone()
    }
}

impl CreateInterceptorProvider for Counting {
    fn provide(&self) -> Arc<dyn CreateInterceptor> {
        Arc::new(Counting {
            name: self.name.clone(),
            calls: self.calls.clone(),
        })
    }
}

impl CreateInterceptor for Counting {
    fn around_tx_create(&self, next: CreateAroundTxFn) -> CreateAroundTxFn {
        let calls = self.calls.clone();
        create_around_tx(move |ctx, object| {
            let next = next.clone();
            calls.fetch_add(1, Ordering::Relaxed);
            async move { next(ctx, object).await }
        })
    }
}

/// Registry of `size` providers; each after a random earlier one.
fn registry(size: usize) -> InterceptorRegistry {
    let mut rng = rand::thread_rng();
    let calls = Arc::new(AtomicU64::new(0));
    let mut registry = InterceptorRegistry::new();
    for i in 0..size {
        let provider = Arc::new(Counting {
            name: format!("p{i}"),
            calls: calls.clone(),
        });
        let registration = registry.create(ObjectType::ServiceInstance, provider);
        let registration = if i == 0 {
            registration
        } else {
            registration.after(format!("p{}", rng.gen_range(0..i)))
        };
        registration
            .register()
            .unwrap_or_else(|e| panic!("registering p{i}: {e}"));
    }
    registry
}

// ============================================================================
// Interceptor Chains
// ============================================================================

fn bench_chain_registration(c: &mut Criterion) {
    let mut group = c.benchmark_group("interceptor-registration");

    for size in CHAIN_SIZES {
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("register", size), &size, |b, &size| {
            b.iter(|| black_box(registry(size)))
        });
    }

    group.finish();
}

fn bench_chain_composition(c: &mut Criterion) {
    let mut group = c.benchmark_group("interceptor-composition");

    for size in CHAIN_SIZES {
        let registry = registry(size);
        let innermost = create_around_tx(|_ctx, object| async move { Ok(object) });

        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("compose", size), &size, |b, _| {
            b.iter(|| {
                let chain = registry
                    .create_chains()
                    .instantiate(ObjectType::ServiceInstance);
                black_box(chain.compose(HookShape::AroundTx, innermost.clone(), |i, next| {
                    i.around_tx_create(next)
                }))
            })
        });
    }

    group.finish();
}

fn bench_intercepted_create(c: &mut Criterion) {
    let mut group = c.benchmark_group("intercepted-create");
    group.measurement_time(Duration::from_secs(5));
    let runtime = Runtime::new().unwrap_or_else(|e| panic!("tokio runtime: {e}"));
    let ctx = RequestContext::background();

    for size in [0, 4, 16] {
        let repository = InterceptableTransactionalRepository::new(
            Arc::new(InMemoryRepository::new()),
            Arc::new(registry(size)),
        );
        group.bench_with_input(BenchmarkId::new("create", size), &size, |b, _| {
            b.iter(|| {
                runtime
                    .block_on(repository.create(&ctx, instance("bench")))
                    .map(black_box)
            })
        });
    }

    group.finish();
}

fn bench_decorated_create(c: &mut Criterion) {
    let mut group = c.benchmark_group("decorated-create");
    group.measurement_time(Duration::from_secs(5));
    let runtime = Runtime::new().unwrap_or_else(|e| panic!("tokio runtime: {e}"));
    let ctx = RequestContext::background();

    let configs = [
        ("none", Vec::new()),
        ("default", ServiceManagerConfig::default().storage.decorator_order),
    ];
    for (label, order) in configs {
        let mut config = ServiceManagerConfig::default();
        config.storage.decorator_order = order;
        let container = runtime
            .block_on(ServiceContainer::build(config))
            .unwrap_or_else(|e| panic!("container: {e}"));

        group.bench_function(BenchmarkId::new("broker", label), |b| {
            b.iter(|| {
                runtime
                    .block_on(container.repository.create(&ctx, broker("bench")))
                    .map(black_box)
            })
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_chain_registration,
    bench_chain_composition,
    bench_intercepted_create,
    bench_decorated_create,
);

criterion_main!(benches);
