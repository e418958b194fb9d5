//! Benchmarks for the CPU side of the flow: noise, reference step, seeding.
//!
//! Run with: `cargo bench`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use glam::Vec3;

use particle_flow::field::{self, Extent};
use particle_flow::population::DEFAULT_SEED;
use particle_flow::{FlowParams, Generation};

fn bench_noise(c: &mut Criterion) {
    let mut group = c.benchmark_group("noise");

    group.bench_function("value_noise3", |b| {
        let p = Vec3::new(12.3, -4.5, 0.75);
        b.iter(|| black_box(field::value_noise3(black_box(p))))
    });

    group.bench_function("noise_direction", |b| {
        let p = Vec3::new(12.3, -4.5, 0.0);
        b.iter(|| black_box(field::noise_direction(black_box(p), 0.75)))
    });

    group.finish();
}

fn bench_reference_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("step_reference");
    let extent = Extent::default();
    let inputs = FlowParams::default().step_inputs(0.5, 1.0 / 720.0, extent);

    for count in [1_000usize, 10_000, 100_000] {
        let generation = Generation::seeded(count, DEFAULT_SEED, extent);
        group.bench_with_input(BenchmarkId::from_parameter(count), &generation, |b, g| {
            b.iter(|| black_box(g.step_reference(&inputs)))
        });
    }

    group.finish();
}

fn bench_seeding(c: &mut Criterion) {
    c.bench_function("seed_1m_particles", |b| {
        b.iter(|| black_box(Generation::seeded(1_000_000, DEFAULT_SEED, Extent::default())))
    });
}

criterion_group!(benches, bench_noise, bench_reference_step, bench_seeding);
criterion_main!(benches);
