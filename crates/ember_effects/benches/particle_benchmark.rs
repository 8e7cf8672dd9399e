//! # Particle Benchmark
//!
//! Frame cost of both particle variants at different ring sizes.
//!
//! Run with: `cargo bench --package ember_effects`

// Benchmarks don't need strict docs
#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use ember_core::{Seed, SeededRandom, Vec3};
use ember_effects::{
    CpuParticleSystem, Emitter, ParticleSystemParams, SoftwareStreamOut, StreamOutParticleSystem,
};

const FRAME: f32 = 1.0 / 60.0;

/// Benchmark: one CPU ring frame (emit, flush, update) at steady state.
fn bench_cpu_ring_frame(c: &mut Criterion) {
    let mut group = c.benchmark_group("cpu_ring_frame");

    for capacity in [1_000usize, 10_000, 100_000] {
        group.bench_with_input(BenchmarkId::from_parameter(capacity), &capacity, |b, &capacity| {
            let params = ParticleSystemParams {
                max_particles: capacity,
                ..ParticleSystemParams::fire()
            };
            let mut system = CpuParticleSystem::new(params).unwrap();
            // Enough to keep the ring around half full
            let rate = capacity as f32 / (2.0 * params.duration);
            let mut emitter = Emitter::new(Vec3::ZERO, rate, params.duration);
            let mut rng = SeededRandom::new(Seed::new(1));

            // Warm up to steady state
            for _ in 0..240 {
                system.emit(&mut emitter, FRAME, Vec3::ZERO, &mut rng);
                let _ = system.flush_new_particles();
                system.update(FRAME);
            }

            b.iter(|| {
                system.emit(&mut emitter, FRAME, Vec3::ZERO, &mut rng);
                let (first, second) = system.flush_new_particles();
                black_box(first.len() + second.len());
                system.update(FRAME);
            });
        });
    }

    group.finish();
}

/// Benchmark: evaluating every live particle, as the vertex stage would.
fn bench_evaluate_live(c: &mut Criterion) {
    let params = ParticleSystemParams {
        max_particles: 10_000,
        ..ParticleSystemParams::smoke()
    };
    let mut system = CpuParticleSystem::new(params).unwrap();
    let mut rng = SeededRandom::new(Seed::new(2));
    for i in 0..9_000 {
        let _ = system.add_particle(Vec3::new(i as f32, 0.0, 0.0), Vec3::ZERO, &mut rng);
    }
    let _ = system.flush_new_particles();
    system.update(1.0);

    c.bench_function("evaluate_9000_particles", |b| {
        b.iter(|| {
            let mut sum = 0.0f32;
            for particle in system.iter_live() {
                sum += particle.evaluate(&params, system.total_time()).size;
            }
            black_box(sum)
        });
    });
}

/// Benchmark: one stream-out step on the software device.
fn bench_stream_out_step(c: &mut Criterion) {
    let params = ParticleSystemParams {
        max_particles: 10_000,
        ..ParticleSystemParams::fire()
    };
    let mut device = SoftwareStreamOut::new(Seed::new(3));
    let mut system = StreamOutParticleSystem::new(&mut device, params, Vec3::ZERO).unwrap();
    let mut emitter = Emitter::new(Vec3::ZERO, 2_000.0, params.duration);

    for _ in 0..240 {
        emitter.track(FRAME, Vec3::ZERO);
        system.simulate(&mut device, FRAME, &emitter).unwrap();
    }

    c.bench_function("stream_out_step", |b| {
        b.iter(|| {
            emitter.track(FRAME, Vec3::ZERO);
            system.simulate(black_box(&mut device), FRAME, &emitter).unwrap();
        });
    });
}

criterion_group!(benches, bench_cpu_ring_frame, bench_evaluate_live, bench_stream_out_step);
criterion_main!(benches);
