use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use glam::{Vec2, Vec3};
use railway_track_engine::core::fresnel::fresnel;
use railway_track_engine::core::track_section::interpolation::{solve_section, EndpointPose};
use railway_track_engine::{Clothoid, Railway, SolverOptions};
use std::hint::black_box;

fn bench_fresnel(c: &mut Criterion) {
    let mut group = c.benchmark_group("fresnel");
    for &x in &[0.1f32, 0.9, 1.9] {
        group.bench_with_input(BenchmarkId::new("f32", x), &x, |b, &x| {
            b.iter(|| black_box(fresnel::<f32>(black_box(x))))
        });
    }
    group.finish();
}

fn bench_clothoid_position(c: &mut Criterion) {
    let clothoid = Clothoid::<f32>::new(Vec2::new(3.0, -2.0), 0.4, 0.01, 0.002, 80.0);

    c.bench_function("clothoid_position_sweep", |b| {
        b.iter(|| {
            let mut sum = Vec2::ZERO;
            for i in 0..=80 {
                sum += clothoid.position_at(black_box(i as f32));
            }
            black_box(sum)
        })
    });
}

fn bench_solver(c: &mut Criterion) {
    let options = SolverOptions::default();
    let start = EndpointPose::<f32>::new(Vec2::ZERO, 0.0, 0.0);
    let cases = [
        ("straight", EndpointPose::<f32>::new(Vec2::new(100.0, 0.0), std::f32::consts::PI, 0.0)),
        (
            "quarter_turn",
            EndpointPose::<f32>::new(Vec2::new(50.0, 50.0), -std::f32::consts::FRAC_PI_2, 0.0),
        ),
        ("s_curve", EndpointPose::<f32>::new(Vec2::new(80.0, -20.0), std::f32::consts::PI, 0.0)),
        ("unloop", EndpointPose::<f32>::new(Vec2::new(200.0, 30.0), std::f32::consts::PI - 0.3, 0.0)),
    ];

    let mut group = c.benchmark_group("solve_section");
    for (name, end) in &cases {
        group.bench_with_input(BenchmarkId::from_parameter(name), end, |b, end| {
            b.iter(|| black_box(solve_section(black_box(&start), black_box(end), &options)))
        });
    }
    group.finish();
}

fn build_grid(count: usize) -> Railway {
    let mut railway = Railway::default();
    for index in 0..count {
        let column = (index % 1000) as f32;
        let row = (index / 1000) as f32;
        railway.add_node(Vec3::new(column * 2.0, row * 2.0, 0.0), 0.0, 0.0, 1);
    }
    railway
}

fn bench_spatial_queries(c: &mut Criterion) {
    let mut group = c.benchmark_group("spatial_queries");
    group.sample_size(20);

    for &node_count in &[1_000usize, 5_000usize] {
        let railway = build_grid(node_count);
        let queries: Vec<Vec2> = (0..1024)
            .map(|i| Vec2::new((i % 1000) as f32 * 2.0 + 0.37, ((i * 7) % 10) as f32 + 0.63))
            .collect();

        group.bench_with_input(
            BenchmarkId::new("closest_batch", node_count),
            &railway,
            |b, railway| {
                b.iter(|| {
                    let hits = queries
                        .iter()
                        .filter(|p| railway.find_closest_node(black_box(**p), 3.0).is_some())
                        .count();
                    black_box(hits)
                })
            },
        );
    }

    group.finish();
}

criterion_group!(
    core_benches,
    bench_fresnel,
    bench_clothoid_position,
    bench_solver,
    bench_spatial_queries
);
criterion_main!(core_benches);
