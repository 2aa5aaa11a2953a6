//! Six-degree-of-freedom pose type.

use serde::{Deserialize, Serialize};

use crate::core::math::Angle;
use crate::core::types::Vector3;

/// A rigid 6-DoF motion as ZXY Euler angles plus translation.
///
/// The estimator keeps two of these: the sweep-to-sweep increment that the
/// solver refines, and the accumulated world pose at sweep end.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose6D {
    /// Rotation about the X axis (pitch).
    pub rot_x: Angle,
    /// Rotation about the Y axis (yaw).
    pub rot_y: Angle,
    /// Rotation about the Z axis (roll).
    pub rot_z: Angle,
    /// Translation in meters.
    pub pos: Vector3,
}

impl Pose6D {
    /// Identity pose at the origin with zero rotation.
    #[inline]
    pub fn identity() -> Self {
        Self::default()
    }
}
