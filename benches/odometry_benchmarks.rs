//! Odometry benchmarks.
//!
//! Measures the per-sweep cost of the full estimator loop and of the
//! k-d tree rebuild on synthetic pole-and-plane sweeps.
//!
//! Run with: `cargo bench`
//! View HTML reports in: `target/criterion/`

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};

use loam_odometry::algorithms::matching::{build_kdtree, test_utils};
use loam_odometry::{LaserOdometry, LaserOdometryConfig, Vector3};

const SCAN_PERIOD: f32 = 0.1;

/// Estimator initialized with one sweep, ready for a motion sweep.
fn seeded_odometry() -> LaserOdometry {
    let mut odometry = LaserOdometry::new(LaserOdometryConfig::default());
    let corners = test_utils::corner_sweep(Vector3::zero(), 0.0, SCAN_PERIOD);
    let surfaces = test_utils::surface_sweep(Vector3::zero(), 0.0, SCAN_PERIOD);
    odometry.update_corner_points_sharp(corners.clone());
    odometry.update_corner_points_less_sharp(corners);
    odometry.update_surf_points_flat(surfaces.clone());
    odometry.update_surf_points_less_flat(surfaces);
    odometry.process();
    odometry
}

fn bench_process_sweep(c: &mut Criterion) {
    let motion = Vector3::new(0.1, 0.01, 0.0);
    let corners = test_utils::corner_sweep(motion, 1.0, SCAN_PERIOD);
    let surfaces = test_utils::surface_sweep(motion, 1.0, SCAN_PERIOD);

    c.bench_function("process_sweep", |b| {
        b.iter_batched(
            seeded_odometry,
            |mut odometry| {
                odometry.update_corner_points_sharp(corners.clone());
                odometry.update_corner_points_less_sharp(corners.clone());
                odometry.update_surf_points_flat(surfaces.clone());
                odometry.update_surf_points_less_flat(surfaces.clone());
                black_box(odometry.process())
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_kdtree_build(c: &mut Criterion) {
    let surfaces = test_utils::surface_sweep(Vector3::zero(), 0.0, SCAN_PERIOD);

    c.bench_function("kdtree_build_surface_cloud", |b| {
        b.iter(|| black_box(build_kdtree(&surfaces)))
    });
}

criterion_group!(benches, bench_process_sweep, bench_kdtree_build);
criterion_main!(benches);
