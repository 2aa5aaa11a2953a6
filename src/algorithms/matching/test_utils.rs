//! Shared test fixtures for the matching and odometry test suites.
//!
//! Builds ring-ordered synthetic sweeps of a static scene: vertical poles
//! for the edge features and a ground plane plus a back wall for the planar
//! features, so all six degrees of freedom are observable. A ground-only
//! variant provides the degenerate counterpart. The same generators drive
//! the unit tests, the integration suite and the benchmarks.

use crate::core::types::{FeatureCloud, FeaturePoint, Vector3};

/// Pole bases (x, z) of the synthetic scene, all at least two meters apart.
const POLE_SITES: [(f32, f32); 8] = [
    (-4.0, 4.0),
    (-2.0, 6.0),
    (0.0, 5.0),
    (2.0, 6.0),
    (4.0, 4.0),
    (-3.0, 8.0),
    (3.0, 8.0),
    (0.0, 9.0),
];

/// Number of beam rings in the synthetic sweeps.
pub const RING_COUNT: usize = 5;

/// Encode ring id and capture time into the intensity channel.
///
/// `rel_frac` is the position within the sweep (0 = start, 1 = end); the
/// wire format stores it scaled by the sweep period.
pub fn pack_intensity(ring: usize, rel_frac: f32, scan_period: f32) -> f32 {
    ring as f32 + rel_frac * scan_period
}

/// Corner sweep: vertical poles sampled once per ring, ring-major order.
///
/// Every point is shifted by `motion * rel_frac`, the portion of the sweep
/// motion it has seen at capture time. A tiny per-index jitter keeps the
/// pole samples from being exactly collinear.
pub fn corner_sweep(motion: Vector3, rel_frac: f32, scan_period: f32) -> FeatureCloud {
    let mut cloud = FeatureCloud::with_capacity(RING_COUNT * POLE_SITES.len());
    let shift = motion * rel_frac;
    for ring in 0..RING_COUNT {
        let height = -0.5 + 0.25 * ring as f32;
        for (i, &(x, z)) in POLE_SITES.iter().enumerate() {
            let jitter = (ring * POLE_SITES.len() + i) as f32 * 1e-4;
            cloud.push(FeaturePoint::new(
                x + jitter + shift.x,
                height + shift.y,
                z + shift.z,
                pack_intensity(ring, rel_frac, scan_period),
            ));
        }
    }
    cloud
}

/// Surface sweep: a ground plane at y = −1 plus a back wall at z = 11,
/// interleaved ring-major.
///
/// 21 ground samples and 13 wall samples per ring, 170 points in total, so
/// the carry-over threshold is met and every translation axis sees a plane
/// normal.
pub fn surface_sweep(motion: Vector3, rel_frac: f32, scan_period: f32) -> FeatureCloud {
    let mut cloud = FeatureCloud::with_capacity(RING_COUNT * 34);
    let shift = motion * rel_frac;
    for ring in 0..RING_COUNT {
        let z = 3.0 + 0.6 * ring as f32;
        for step in 0..21 {
            let x = -4.0 + 0.4 * step as f32;
            cloud.push(FeaturePoint::new(
                x + shift.x,
                -1.0 + shift.y,
                z + shift.z,
                pack_intensity(ring, rel_frac, scan_period),
            ));
        }
        let y = -0.5 + 0.25 * ring as f32;
        for step in 0..13 {
            let x = -3.0 + 0.5 * step as f32;
            cloud.push(FeaturePoint::new(
                x + shift.x,
                y + shift.y,
                11.0 + shift.z,
                pack_intensity(ring, rel_frac, scan_period),
            ));
        }
    }
    cloud
}

/// Ground-only surface sweep: the y = −1 plane with no wall, 105 points.
///
/// Only the plane normal direction is constrained; pair with
/// [`planar_corner_sweep`] for a degenerate scene.
pub fn ground_sweep(motion: Vector3, rel_frac: f32, scan_period: f32) -> FeatureCloud {
    let mut cloud = FeatureCloud::with_capacity(RING_COUNT * 21);
    let shift = motion * rel_frac;
    for ring in 0..RING_COUNT {
        let z = 3.0 + 0.6 * ring as f32;
        for step in 0..21 {
            let x = -4.0 + 0.4 * step as f32;
            cloud.push(FeaturePoint::new(
                x + shift.x,
                -1.0 + shift.y,
                z + shift.z,
                pack_intensity(ring, rel_frac, scan_period),
            ));
        }
    }
    cloud
}

/// Degenerate corner sweep: every edge line lies in the ground plane,
/// running close to z with a small alternating x-slant per line.
///
/// Nothing leaves the plane, so the out-of-plane translation stays far
/// below the observability threshold, while the alternating slants keep
/// its normal-matrix entry away from exact zero.
pub fn planar_corner_sweep(motion: Vector3, rel_frac: f32, scan_period: f32) -> FeatureCloud {
    let mut cloud = FeatureCloud::with_capacity(RING_COUNT * 12);
    let shift = motion * rel_frac;
    for ring in 0..RING_COUNT {
        let z = 4.0 + 0.3 * ring as f32;
        for line in 0..12 {
            let slant = if line % 2 == 0 { 0.1 } else { -0.1 };
            let x = -3.3 + 0.6 * line as f32 + slant * 0.3 * ring as f32;
            let jitter = (ring * 12 + line) as f32 * 1e-4;
            cloud.push(FeaturePoint::new(
                x + shift.x,
                -1.0 + jitter + shift.y,
                z + shift.z,
                pack_intensity(ring, rel_frac, scan_period),
            ));
        }
    }
    cloud
}
