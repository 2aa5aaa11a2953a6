//! Sensor-side processing: inertial hints and motion de-skew.

pub mod deskew;
pub mod imu;
