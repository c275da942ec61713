//! Criterion benchmarks for building the task table and running episodes.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use tabletop_bench::{run_episodes, standard_registry, JitterSampler};
use tabletop_core::rng_from_seed;
use tabletop_tasks::matrix::{generate_task_definitions, TaskMatrixConfig};
use tabletop_test_utils::{kitchen_catalog, MockAssetFactory, MockFixtures, MockSim};

fn bench_registry(c: &mut Criterion) {
    let catalog = kitchen_catalog();
    let config = TaskMatrixConfig::default();

    c.bench_function("standard_registry", |b| {
        b.iter(|| standard_registry(black_box(&catalog)).unwrap());
    });

    c.bench_function("generate_task_definitions", |b| {
        b.iter(|| {
            let mut rng = rng_from_seed(42);
            generate_task_definitions(black_box(&config), &catalog, &mut rng).unwrap()
        });
    });
}

fn bench_episodes(c: &mut Criterion) {
    let catalog = kitchen_catalog();
    let registry = standard_registry(&catalog).unwrap();
    let mut group = c.benchmark_group("episode_reset");

    for id in [
        "PnPOnionToBowl",
        "PnPObjectsToTieredBasketLevel",
        "PnPCupToCabinetClose",
        "PretrainPnPBaseFromCuttingBoardToBasketSplitA",
        "PutAllObjectsInBasket",
    ] {
        let Ok(mut engine) = registry.engine(id, &catalog) else {
            continue;
        };
        let fixtures = MockFixtures::kitchen();
        let mut factory = MockAssetFactory::kitchen(catalog.clone());
        let mut sampler = JitterSampler;
        let mut seed = 0u64;
        group.bench_function(id, |b| {
            b.iter(|| {
                seed += 1;
                let mut sim = MockSim::new();
                let _ = engine.reset(seed, &fixtures, &mut factory, &mut sampler, &mut sim);
                factory.clear_requests();
            });
        });
    }
    group.finish();

    c.bench_function("run_episodes_onion_x32", |b| {
        b.iter(|| run_episodes(&registry, &catalog, "PnPOnionToBowl", 0..32).unwrap());
    });
}

criterion_group!(benches, bench_registry, bench_episodes);
criterion_main!(benches);
