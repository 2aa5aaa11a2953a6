//! Orchestration layer: the per-sweep estimator state machine.

pub mod odometry;
