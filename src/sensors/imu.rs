//! Per-sweep inertial hints.

use serde::{Deserialize, Serialize};

use crate::core::math::Angle;
use crate::core::types::Vector3;

/// Inertial summary for one sweep, decoded from the upstream four-point
/// packet.
///
/// The packet rows are, in order: attitude at sweep start, attitude at sweep
/// end, accumulated position drift since sweep start in the world frame, and
/// accumulated velocity drift since sweep start. Attitude rows carry
/// (pitch, yaw, roll) in their (x, y, z) components.
///
/// Defaults to all zeros so the estimator also runs without an inertial
/// source.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ImuState {
    /// Pitch at sweep start.
    pub pitch_start: Angle,
    /// Yaw at sweep start.
    pub yaw_start: Angle,
    /// Roll at sweep start.
    pub roll_start: Angle,
    /// Pitch at sweep end.
    pub pitch_end: Angle,
    /// Yaw at sweep end.
    pub yaw_end: Angle,
    /// Roll at sweep end.
    pub roll_end: Angle,
    /// Position drift since sweep start, world frame (meters).
    pub shift_from_start: Vector3,
    /// Velocity drift since sweep start (meters per second).
    pub velo_from_start: Vector3,
}

impl ImuState {
    /// Decode the four-point packet.
    ///
    /// # Panics
    ///
    /// Panics when the packet does not hold exactly four rows; a malformed
    /// packet is a programming error in the producer, not a runtime
    /// condition.
    pub fn from_packet(packet: &[Vector3]) -> Self {
        assert_eq!(
            packet.len(),
            4,
            "IMU packet must hold exactly four rows: start attitude, end attitude, shift, velocity"
        );
        Self {
            pitch_start: Angle::new(packet[0].x),
            yaw_start: Angle::new(packet[0].y),
            roll_start: Angle::new(packet[0].z),
            pitch_end: Angle::new(packet[1].x),
            yaw_end: Angle::new(packet[1].y),
            roll_end: Angle::new(packet[1].z),
            shift_from_start: packet[2],
            velo_from_start: packet[3],
        }
    }
}
