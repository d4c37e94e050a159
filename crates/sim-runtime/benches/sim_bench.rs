use criterion::{criterion_group, criterion_main, Criterion};
use sim_core::{Catalog, CooldownPlan, SimConfig, Snapshot};
use sim_runtime::Engine;

const CATALOG: &str = include_str!("../../../assets/catalog.yaml");
const SNAPSHOT: &str = include_str!("../../../assets/snapshot.yaml");
const PLAN: &str = include_str!("../../../assets/plan.yaml");

fn bench_runs(c: &mut Criterion) {
    let catalog = Catalog::from_yaml_str(CATALOG).unwrap();
    let engine = Engine::new(catalog, SimConfig::default()).unwrap();
    let snapshot: Snapshot = serde_yaml::from_str(SNAPSHOT).unwrap();
    let plan: CooldownPlan = serde_yaml::from_str(PLAN).unwrap();

    c.bench_function("simulate idle", |b| {
        b.iter(|| {
            let _ = engine.simulate(&snapshot, None);
        })
    });
    c.bench_function("simulate active", |b| {
        b.iter(|| {
            let _ = engine.simulate(&snapshot, Some(&plan));
        })
    });
    let variants = vec![None, Some(plan.clone()), Some(CooldownPlan::default())];
    c.bench_function("simulate 3 variants", |b| {
        b.iter(|| {
            let _ = engine.simulate_variants(&snapshot, &variants);
        })
    });
}

criterion_group!(benches, bench_runs);
criterion_main!(benches);
