//! Feature matching between consecutive sweeps.
//!
//! The previous sweep's less-sharp and less-flat clouds are the matching
//! targets, indexed by k-d trees. For every sharp corner the search yields
//! an edge line (two points on neighbouring rings), for every flat surface
//! point a plane (three points spanning rings); the residual module turns
//! those into weighted point-to-line and point-to-plane terms, and the
//! Gauss-Newton module assembles and solves the 6-DoF normal equations.

mod correspondence;
mod gauss_newton;
mod residual;

pub mod test_utils;

pub use correspondence::{
    find_edge_pair, find_plane_triple, MAX_NEIGHBOR_SQ_DIST, RING_WINDOW,
};
pub use gauss_newton::{
    build_normal_equations, degeneracy_projector, solve, EIGEN_THRESHOLD,
};
pub use residual::{edge_coefficient, plane_coefficient, Coefficient, WEIGHTING_START_ITER};

use crate::core::types::FeatureCloud;

/// K-d tree over feature-cloud positions.
///
/// Uses a larger bucket size than `kiddo`'s default (32) because the
/// synthetic and real sweeps used by this crate can carry many points that
/// share an exact coordinate on one axis (e.g. a flat ground plane), which
/// the default bucket size is too small to hold in a single leaf.
pub type KdTree = kiddo::float::kdtree::KdTree<f32, u64, 3, 256, u32>;

/// Build a k-d tree over the positions of a feature cloud.
///
/// Tree items are indices into the cloud, so lookups can read the ring id
/// back off the matched point.
pub fn build_kdtree(cloud: &FeatureCloud) -> KdTree {
    let mut tree: KdTree = KdTree::new();
    for (i, point) in cloud.iter().enumerate() {
        tree.add(&[point.x, point.y, point.z], i as u64);
    }
    tree
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::FeaturePoint;
    use kiddo::SquaredEuclidean;

    #[test]
    fn test_build_kdtree_indexes_cloud_order() {
        let mut cloud = FeatureCloud::new();
        cloud.push(FeaturePoint::new(0.0, 0.0, 0.0, 0.0));
        cloud.push(FeaturePoint::new(5.0, 0.0, 0.0, 1.0));
        cloud.push(FeaturePoint::new(0.0, 5.0, 0.0, 2.0));

        let tree = build_kdtree(&cloud);
        let hit = tree.nearest_one::<SquaredEuclidean>(&[4.9, 0.1, 0.0]);
        assert_eq!(hit.item, 1);
    }
}
