//! Correspondence search against the previous sweep's feature clouds.
//!
//! Each query point is matched by a k-d tree 1-NN lookup that anchors an
//! index scan through the ring-ordered target cloud. Edge queries need a
//! second point on a neighbouring ring to span a line; planar queries need
//! two more points, one on the same or a closer ring and one on a different
//! ring, to span a plane.

use kiddo::SquaredEuclidean;

use super::KdTree;
use crate::core::types::{FeatureCloud, Vector3};

/// Squared-distance gate for accepting a nearest neighbour (m²).
pub const MAX_NEIGHBOR_SQ_DIST: f32 = 25.0;

/// Ring-index window around the anchor ring for the candidate scans.
pub const RING_WINDOW: i32 = 2;

/// Find the two points of an edge line in the previous corner cloud.
///
/// Returns the 1-NN anchor `A` and the closest candidate `B` on a different
/// ring within the ±[`RING_WINDOW`] window, or `None` when either is
/// missing. The forward scan only accepts rings above the anchor's, the
/// backward scan only rings below; both stop at the window edge. Ties on
/// squared distance keep the candidate found first.
pub fn find_edge_pair(
    query: &Vector3,
    last_corner: &FeatureCloud,
    tree: &KdTree,
) -> Option<(usize, usize)> {
    if last_corner.is_empty() {
        return None;
    }

    let nearest = tree.nearest_one::<SquaredEuclidean>(&[query.x, query.y, query.z]);
    if nearest.distance >= MAX_NEIGHBOR_SQ_DIST {
        return None;
    }
    let anchor = nearest.item as usize;
    let anchor_ring = last_corner.points[anchor].ring();

    let mut best_sq = MAX_NEIGHBOR_SQ_DIST;
    let mut best = None;

    for (j, point) in last_corner.points.iter().enumerate().skip(anchor + 1) {
        if point.ring() > anchor_ring + RING_WINDOW {
            break;
        }
        if point.ring() <= anchor_ring {
            continue;
        }
        let sq_dist = point.squared_distance(query);
        if sq_dist < best_sq {
            best_sq = sq_dist;
            best = Some(j);
        }
    }
    for j in (0..anchor).rev() {
        let point = &last_corner.points[j];
        if point.ring() < anchor_ring - RING_WINDOW {
            break;
        }
        if point.ring() >= anchor_ring {
            continue;
        }
        let sq_dist = point.squared_distance(query);
        if sq_dist < best_sq {
            best_sq = sq_dist;
            best = Some(j);
        }
    }

    best.map(|b| (anchor, b))
}

/// Find the three points of a matching plane in the previous surface cloud.
///
/// Returns the 1-NN anchor `A`, the closest candidate `B` on the anchor's
/// side of the ring ordering, and the closest candidate `C` on the opposite
/// side, or `None` when any of them is missing. The ring-side rules differ
/// between the scan directions: the forward scan routes rings at or below
/// the anchor's to `B` and strictly above to `C`, the backward scan routes
/// rings at or above to `B` and strictly below to `C`. The asymmetry keeps
/// the triple from collapsing onto a single scan line.
pub fn find_plane_triple(
    query: &Vector3,
    last_surface: &FeatureCloud,
    tree: &KdTree,
) -> Option<(usize, usize, usize)> {
    if last_surface.is_empty() {
        return None;
    }

    let nearest = tree.nearest_one::<SquaredEuclidean>(&[query.x, query.y, query.z]);
    if nearest.distance >= MAX_NEIGHBOR_SQ_DIST {
        return None;
    }
    let anchor = nearest.item as usize;
    let anchor_ring = last_surface.points[anchor].ring();

    let mut best_same_sq = MAX_NEIGHBOR_SQ_DIST;
    let mut best_same = None;
    let mut best_other_sq = MAX_NEIGHBOR_SQ_DIST;
    let mut best_other = None;

    for (j, point) in last_surface.points.iter().enumerate().skip(anchor + 1) {
        if point.ring() > anchor_ring + RING_WINDOW {
            break;
        }
        let sq_dist = point.squared_distance(query);
        if point.ring() <= anchor_ring {
            if sq_dist < best_same_sq {
                best_same_sq = sq_dist;
                best_same = Some(j);
            }
        } else if sq_dist < best_other_sq {
            best_other_sq = sq_dist;
            best_other = Some(j);
        }
    }
    for j in (0..anchor).rev() {
        let point = &last_surface.points[j];
        if point.ring() < anchor_ring - RING_WINDOW {
            break;
        }
        let sq_dist = point.squared_distance(query);
        if point.ring() >= anchor_ring {
            if sq_dist < best_same_sq {
                best_same_sq = sq_dist;
                best_same = Some(j);
            }
        } else if sq_dist < best_other_sq {
            best_other_sq = sq_dist;
            best_other = Some(j);
        }
    }

    match (best_same, best_other) {
        (Some(b), Some(c)) => Some((anchor, b, c)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::matching::build_kdtree;
    use crate::core::types::FeaturePoint;

    /// Ring-major cloud from (x, y, z, ring) tuples.
    fn cloud_from(points: &[(f32, f32, f32, i32)]) -> FeatureCloud {
        let mut cloud = FeatureCloud::with_capacity(points.len());
        for &(x, y, z, ring) in points {
            cloud.push(FeaturePoint::new(x, y, z, ring as f32));
        }
        cloud
    }

    #[test]
    fn test_edge_pair_respects_ring_window() {
        // Anchor at ring 5; candidates on rings 3..=8. Ring 5 shares the
        // anchor's ring and ring 8 sits past the ±2 window, so the partner
        // must come from rings {3, 4, 6, 7} even though the ring-8 point is
        // the closest of all.
        let cloud = cloud_from(&[
            (0.0, 0.0, 1.0, 3),
            (0.0, 0.0, 0.6, 4),
            (0.0, 0.0, 0.0, 5),   // anchor
            (0.3, 0.0, 0.0, 5),   // same ring, closest but excluded
            (0.0, 0.0, -0.5, 6),
            (0.0, 0.0, -0.9, 7),
            (0.05, 0.0, -0.05, 8), // nearly on top of the anchor, outside window
        ]);
        let tree = build_kdtree(&cloud);
        let query = Vector3::new(0.0, 0.0, 0.01);

        let (anchor, partner) = find_edge_pair(&query, &cloud, &tree).unwrap();
        assert_eq!(anchor, 2);
        let partner_ring = cloud.points[partner].ring();
        assert!(
            (3..=7).contains(&partner_ring) && partner_ring != 5,
            "partner ring {partner_ring} outside the admissible set"
        );
        // Ring 6 is the nearest admissible candidate.
        assert_eq!(partner, 4);
    }

    #[test]
    fn test_edge_pair_rejects_distant_anchor() {
        let cloud = cloud_from(&[(10.0, 0.0, 0.0, 0), (10.0, 0.0, 0.5, 1)]);
        let tree = build_kdtree(&cloud);
        // Nearest neighbour is 10 m away, past the 5 m gate.
        assert!(find_edge_pair(&Vector3::zero(), &cloud, &tree).is_none());
    }

    #[test]
    fn test_edge_pair_requires_different_ring() {
        // Only same-ring candidates: no line partner.
        let cloud = cloud_from(&[
            (0.0, 0.0, 0.0, 2),
            (0.1, 0.0, 0.0, 2),
            (0.2, 0.0, 0.0, 2),
        ]);
        let tree = build_kdtree(&cloud);
        assert!(find_edge_pair(&Vector3::zero(), &cloud, &tree).is_none());
    }

    #[test]
    fn test_edge_pair_empty_target() {
        let cloud = FeatureCloud::new();
        let tree = build_kdtree(&cloud);
        assert!(find_edge_pair(&Vector3::zero(), &cloud, &tree).is_none());
    }

    #[test]
    fn test_plane_triple_ring_side_routing() {
        // Anchor on ring 4. The forward scan must take the same-ring point
        // as B and the higher-ring point as C; the ring-3 point behind the
        // anchor also competes for B per the backward-scan routing.
        let cloud = cloud_from(&[
            (0.0, 0.0, -2.0, 3),  // backward, lower ring -> C candidate
            (0.0, 0.0, 0.0, 4),   // anchor
            (0.4, 0.0, 0.0, 4),   // forward, same ring -> B
            (0.0, 0.0, 0.5, 5),   // forward, higher ring -> C
        ]);
        let tree = build_kdtree(&cloud);
        let query = Vector3::new(0.0, 0.0, 0.01);

        let (anchor, b, c) = find_plane_triple(&query, &cloud, &tree).unwrap();
        assert_eq!(anchor, 1);
        assert_eq!(b, 2, "B must stay on the anchor's ring side");
        assert_eq!(c, 3, "C must come from a different ring");
    }

    #[test]
    fn test_plane_triple_needs_both_partners() {
        // No candidate on a different ring: the plane cannot be spanned.
        let cloud = cloud_from(&[
            (0.0, 0.0, 0.0, 1),
            (0.3, 0.0, 0.0, 1),
            (0.6, 0.0, 0.0, 1),
        ]);
        let tree = build_kdtree(&cloud);
        assert!(find_plane_triple(&Vector3::zero(), &cloud, &tree).is_none());
    }

    #[test]
    fn test_plane_triple_backward_same_ring_goes_to_b() {
        // Backward scan: a point on the anchor's own ring routes to B.
        let cloud = cloud_from(&[
            (0.2, 0.0, 0.0, 4),  // backward, same ring -> B
            (0.0, 0.0, 0.0, 4),  // anchor
            (0.0, 0.0, 0.6, 6),  // forward, higher ring -> C
        ]);
        let tree = build_kdtree(&cloud);
        let query = Vector3::new(0.0, 0.0, 0.01);

        let (anchor, b, c) = find_plane_triple(&query, &cloud, &tree).unwrap();
        assert_eq!(anchor, 1);
        assert_eq!(b, 0);
        assert_eq!(c, 2);
    }
}
