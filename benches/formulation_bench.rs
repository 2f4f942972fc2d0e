//! Criterion benchmarks for u-bulkport model construction.
//!
//! Uses generated instances to measure slot calculation and model building
//! without any solver in the loop.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use u_bulkport::formulation::{FormulationConfig, ModelBuilder, TransshipmentLinearization};
use u_bulkport::instance::{GeneratorConfig, Instance, InstanceGenerator};
use u_bulkport::milp::to_lp_string;

fn instance(berths: usize, ships: usize) -> Instance {
    let config = GeneratorConfig::new(berths, ships)
        .with_yard(8, 16)
        .with_compartments(3)
        .with_seed(42);
    InstanceGenerator::generate(&config).expect("benchmark instance")
}

fn bench_generate(c: &mut Criterion) {
    let mut group = c.benchmark_group("generate");
    group.sample_size(20);

    for &ships in &[4, 8, 16] {
        let config = GeneratorConfig::new(3, ships).with_yard(8, 16).with_seed(42);
        group.bench_with_input(BenchmarkId::from_parameter(ships), &config, |b, config| {
            b.iter(|| {
                let result = InstanceGenerator::generate(black_box(config));
                black_box(result)
            })
        });
    }
    group.finish();
}

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("build");
    group.sample_size(10);

    for &ships in &[2, 4, 8] {
        let inst = instance(2, ships);
        for (name, linearization) in [
            ("product", TransshipmentLinearization::Product),
            ("aggregate", TransshipmentLinearization::BerthAggregate),
        ] {
            let config = FormulationConfig::default().with_linearization(linearization);
            group.bench_with_input(
                BenchmarkId::new(name, ships),
                &(&inst, config),
                |b, (inst, config)| {
                    b.iter(|| {
                        let result = ModelBuilder::build(black_box(inst), black_box(config));
                        black_box(result)
                    })
                },
            );
        }
    }
    group.finish();
}

fn bench_lp_export(c: &mut Criterion) {
    let mut group = c.benchmark_group("lp_export");
    group.sample_size(10);

    let inst = instance(2, 4);
    let formulation =
        ModelBuilder::build(&inst, &FormulationConfig::default()).expect("benchmark model");
    group.bench_function("ships_4", |b| {
        b.iter(|| black_box(to_lp_string(black_box(&formulation.model))))
    });
    group.finish();
}

criterion_group!(benches, bench_generate, bench_build, bench_lp_export);
criterion_main!(benches);
