//! Core data types.

mod point;
mod pose;

pub use point::{FeatureCloud, FeaturePoint, Vector3};
pub use pose::Pose6D;
