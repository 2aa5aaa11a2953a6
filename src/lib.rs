//! Scan-to-scan LiDAR odometry for rotating multi-beam sensors.
//!
//! Estimates the 6-DoF rigid motion between consecutive sweeps from the
//! edge and planar feature clouds an upstream extractor produces, corrects
//! intra-sweep motion distortion under a constant-velocity model, and
//! accumulates the per-sweep increments into a drift-resistant world pose
//! with an optional inertial correction. The approach follows Zhang and
//! Singh, "LOAM: Lidar Odometry and Mapping in Real-time".
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                    engine/                          │  ← Orchestration
//! │           (per-sweep estimator loop)                │
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                  algorithms/                        │  ← Core algorithms
//! │   (correspondences, residuals, Gauss-Newton)        │
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                   sensors/                          │  ← Sensor processing
//! │              (de-skew, IMU packet)                  │
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                     core/                           │  ← Foundation
//! │                 (types, math)                       │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use loam_odometry::{FeatureCloud, LaserOdometry, LaserOdometryConfig};
//!
//! let mut odometry = LaserOdometry::new(LaserOdometryConfig::default());
//!
//! // Per sweep, from the upstream feature extractor:
//! odometry.update_corner_points_sharp(corner_sharp);
//! odometry.update_corner_points_less_sharp(corner_less_sharp);
//! odometry.update_surf_points_flat(surf_flat);
//! odometry.update_surf_points_less_flat(surf_less_flat);
//! odometry.update_imu(&imu_packet);
//!
//! let summary = odometry.process();
//! println!("world pose: {:?}", odometry.transform_sum());
//! ```

// ============================================================================
// Layer 1: Core foundation (no internal deps)
// ============================================================================
pub mod core;

// ============================================================================
// Layer 2: Sensor processing (depends on core)
// ============================================================================
pub mod sensors;

// ============================================================================
// Layer 3: Algorithms (depends on core)
// ============================================================================
pub mod algorithms;

// ============================================================================
// Layer 4: Engine (depends on all layers)
// ============================================================================
pub mod engine;

// ============================================================================
// Convenience re-exports (flat namespace for common use)
// ============================================================================

pub use crate::core::math::Angle;
pub use crate::core::types::{FeatureCloud, FeaturePoint, Pose6D, Vector3};
pub use engine::odometry::{LaserOdometry, LaserOdometryConfig, SweepSummary};
pub use sensors::imu::ImuState;
