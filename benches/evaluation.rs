//! Flag Evaluation Benchmark (Criterion)
//!
//! Measures the rule evaluator on its own and the engine end to end, with
//! and without the evaluation cache.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use flag_engine::{EvaluationContext, Evaluator, Flag, FlagEngine, MemoryFlagStore};
use std::sync::Arc;

/// Flag whose roles and groups never match, so evaluation falls through to
/// the percentage rollout.
fn rollout_flag(list_len: usize) -> Flag {
    let mut builder = Flag::builder("rollout").percent(50.0);
    for i in 0..list_len {
        builder = builder
            .user(format!("listed-{}", i))
            .role(format!("role-{}", i))
            .group(format!("group-{}", i));
    }
    builder.build()
}

fn sample_context() -> EvaluationContext {
    EvaluationContext::builder()
        .with_user("user-12345")
        .with_roles(["developer", "reviewer"])
        .with_groups(["engineering", "platform"])
        .build()
}

fn benchmark_rule_evaluation(c: &mut Criterion) {
    let evaluator = Evaluator::new();
    let context = sample_context();
    let mut group = c.benchmark_group("rule_evaluation");

    for list_len in [0, 10, 100].iter() {
        let flag = rollout_flag(*list_len);
        group.bench_with_input(BenchmarkId::new("list_len", list_len), &flag, |b, flag| {
            b.iter(|| std::hint::black_box(evaluator.evaluate(flag, &context)));
        });
    }

    group.finish();
}

fn benchmark_engine(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let context = sample_context();
    let mut group = c.benchmark_group("engine_evaluate");

    for cached in [false, true] {
        let engine = runtime.block_on(async {
            let store = MemoryFlagStore::with_flags(vec![rollout_flag(10)]).unwrap();
            FlagEngine::builder()
                .with_store(Arc::new(store))
                .with_cache_enabled(cached)
                .with_telemetry_enabled(false)
                .build()
                .await
                .unwrap()
        });

        group.bench_function(BenchmarkId::new("cached", cached), |b| {
            b.to_async(&runtime)
                .iter(|| async { std::hint::black_box(engine.evaluate("rollout", &context).await) });
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_rule_evaluation, benchmark_engine);
criterion_main!(benches);
