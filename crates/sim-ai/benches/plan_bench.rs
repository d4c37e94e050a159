use criterion::{black_box, criterion_group, criterion_main, Criterion};
use sim_ai::LevelingPlan;
use sim_core::{BigNum, Catalog};
use sim_econ::UnlockEffects;

const CATALOG: &str = include_str!("../../../assets/catalog.yaml");

fn bench_plan(c: &mut Criterion) {
    let catalog = Catalog::from_yaml_str(CATALOG).expect("bundled catalog");
    let effects = UnlockEffects::default();
    c.bench_function("plan 400 windows to 1e200", |b| {
        b.iter(|| {
            let mut plan = LevelingPlan::new(&catalog, &effects).expect("plan");
            for step in 1..=400 {
                let total = BigNum::from_log10(step as f64 * 0.5).expect("finite");
                let target = BigNum::from_log10(step as f64 * 0.45).expect("finite");
                let _ = black_box(plan.advance(&total, &target));
            }
        })
    });
}

criterion_group!(benches, bench_plan);
criterion_main!(benches);
