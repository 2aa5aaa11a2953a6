//! Intra-sweep motion distortion correction.
//!
//! The sensor keeps moving while a sweep is captured. Under a constant
//! velocity model, a point captured at fraction `s` of the sweep has seen
//! fraction `s` of the inter-sweep motion; the operators here undo that
//! partial motion to express points in the sweep-start frame, or carry them
//! forward to the sweep-end frame.

use crate::core::math::{rotate_yxz, rotate_zxy, Angle};
use crate::core::types::{FeatureCloud, FeaturePoint, Pose6D};
use crate::sensors::imu::ImuState;

/// Fraction of the inter-sweep motion attributed to `point`.
#[inline]
fn interpolation_ratio(point: &FeaturePoint, scan_period: f32) -> f32 {
    point.time_offset() / scan_period
}

/// Map a point captured mid-sweep back to the sweep-start frame.
///
/// Applies the inverse of the interpolated motion: translation first, then
/// the ZXY rotation with negated, scaled angles. The intensity channel is
/// preserved. A point captured at the sweep start (`s = 0`) is returned
/// unchanged.
pub fn project_to_start(point: &FeaturePoint, transform: &Pose6D, scan_period: f32) -> FeaturePoint {
    let s = interpolation_ratio(point, scan_period);

    let mut pos = point.position() - transform.pos * s;
    rotate_zxy(
        &mut pos,
        Angle::new(-s * transform.rot_z.rad()),
        Angle::new(-s * transform.rot_x.rad()),
        Angle::new(-s * transform.rot_y.rad()),
    );

    let mut projected = *point;
    projected.set_position(pos);
    projected
}

/// Map every point of `cloud` to the sweep-end frame, in place.
///
/// Each point is first taken back to the sweep-start frame, then moved
/// through the full sweep motion and the inertial start/end attitude
/// correction. The fractional time offset is stripped from the intensity
/// channel; the ring id survives.
pub fn project_cloud_to_end(
    cloud: &mut FeatureCloud,
    transform: &Pose6D,
    imu: &ImuState,
    scan_period: f32,
) {
    for point in &mut cloud.points {
        let s = interpolation_ratio(point, scan_period);

        let mut pos = point.position() - transform.pos * s;
        rotate_zxy(
            &mut pos,
            Angle::new(-s * transform.rot_z.rad()),
            Angle::new(-s * transform.rot_x.rad()),
            Angle::new(-s * transform.rot_y.rad()),
        );
        rotate_yxz(&mut pos, transform.rot_y, transform.rot_x, transform.rot_z);

        pos += transform.pos - imu.shift_from_start;

        rotate_zxy(&mut pos, imu.roll_start, imu.pitch_start, imu.yaw_start);
        rotate_yxz(&mut pos, -imu.yaw_end, -imu.pitch_end, -imu.roll_end);

        point.set_position(pos);
        point.intensity = point.ring() as f32;
    }
}
