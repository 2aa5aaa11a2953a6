//! Sweep-to-sweep odometry estimator.
//!
//! Consumes the four feature clouds and the inertial packet of one sweep,
//! refines the inter-sweep motion with a degeneracy-aware Gauss-Newton
//! loop, and accumulates the result into the world pose. The less-sharp and
//! less-flat clouds are projected to the sweep end and carried over as the
//! matching targets for the next sweep.

use nalgebra::{Matrix6, Vector6};

use crate::algorithms::matching::{
    build_kdtree, build_normal_equations, degeneracy_projector, edge_coefficient, find_edge_pair,
    find_plane_triple, plane_coefficient, solve, Coefficient, KdTree, EIGEN_THRESHOLD,
    WEIGHTING_START_ITER,
};
use crate::core::math::{accumulate_rotation, plugin_imu_rotation, rotate_zxy, Angle};
use crate::core::types::{FeatureCloud, FeaturePoint, Pose6D, Vector3};
use crate::sensors::deskew::{project_cloud_to_end, project_to_start};
use crate::sensors::imu::ImuState;

/// Minimum carried-forward corner points required for matching.
const MIN_CORNER_POINTS: usize = 10;

/// Minimum carried-forward surface points required for matching.
const MIN_SURFACE_POINTS: usize = 100;

/// Minimum selected correspondences for a meaningful normal system; an
/// iteration with fewer is skipped without updating the transform.
const MIN_CORRESPONDENCES: usize = 10;

/// Iterations between correspondence refreshes; cached neighbour indices
/// are reused in between to amortize the k-d tree queries.
const MATCH_REFRESH_INTERVAL: usize = 5;

/// Empirical gain on the vertical rotation axis and the Z translation,
/// compensating a sensor-specific scale bias. Preserved verbatim from the
/// field calibration.
const VERTICAL_GAIN: f32 = 1.05;

/// Configuration for [`LaserOdometry`], fixed at construction.
#[derive(Debug, Clone, Copy)]
pub struct LaserOdometryConfig {
    /// Duration of one full sensor rotation in seconds.
    pub scan_period: f32,

    /// Maximum Gauss-Newton iterations per sweep.
    pub max_iterations: usize,

    /// Convergence threshold on the translation update (centimeters).
    pub delta_t_abort: f32,

    /// Convergence threshold on the rotation update (degrees).
    pub delta_r_abort: f32,
}

impl Default for LaserOdometryConfig {
    fn default() -> Self {
        Self {
            scan_period: 0.1,
            max_iterations: 25,
            delta_t_abort: 0.1,
            delta_r_abort: 0.1,
        }
    }
}

/// Outcome of one processed sweep.
#[derive(Debug, Clone, Copy, Default)]
pub struct SweepSummary {
    /// Gauss-Newton iterations executed; zero when matching was skipped.
    pub iterations: usize,
    /// Correspondences selected in the last executed iteration.
    pub correspondences: usize,
    /// Whether the normal matrix was flagged degenerate this sweep.
    pub degenerate: bool,
    /// Whether the loop terminated on the delta thresholds.
    pub converged: bool,
}

/// Scan-to-scan LiDAR odometry estimator.
///
/// Single-threaded: [`process`](Self::process) runs one sweep to completion.
/// Feed the four feature clouds (and optionally the IMU packet) between
/// calls; read the world pose and the projected clouds afterwards.
pub struct LaserOdometry {
    config: LaserOdometryConfig,
    initialized: bool,
    frame_count: usize,

    corner_sharp: FeatureCloud,
    corner_less_sharp: FeatureCloud,
    surf_flat: FeatureCloud,
    surf_less_flat: FeatureCloud,

    last_corner: FeatureCloud,
    last_surface: FeatureCloud,
    last_corner_tree: KdTree,
    last_surface_tree: KdTree,

    imu: ImuState,

    transform: Pose6D,
    transform_sum: Pose6D,

    /// Cached edge neighbours per sharp corner query.
    corner_matches: Vec<Option<(usize, usize)>>,
    /// Cached plane neighbours per flat surface query.
    surface_matches: Vec<Option<(usize, usize, usize)>>,
    /// Query points selected in the current iteration, original coordinates.
    selected_points: Vec<FeaturePoint>,
    /// Weighted residual gradients, in lockstep with `selected_points`.
    selected_coeffs: Vec<Coefficient>,
}

impl LaserOdometry {
    /// Create an estimator with the given configuration.
    pub fn new(config: LaserOdometryConfig) -> Self {
        Self {
            config,
            initialized: false,
            frame_count: 0,
            corner_sharp: FeatureCloud::new(),
            corner_less_sharp: FeatureCloud::new(),
            surf_flat: FeatureCloud::new(),
            surf_less_flat: FeatureCloud::new(),
            last_corner: FeatureCloud::new(),
            last_surface: FeatureCloud::new(),
            last_corner_tree: KdTree::new(),
            last_surface_tree: KdTree::new(),
            imu: ImuState::default(),
            transform: Pose6D::identity(),
            transform_sum: Pose6D::identity(),
            corner_matches: Vec::new(),
            surface_matches: Vec::new(),
            selected_points: Vec::new(),
            selected_coeffs: Vec::new(),
        }
    }

    /// Set the sharp corner cloud for the current sweep.
    pub fn update_corner_points_sharp(&mut self, cloud: FeatureCloud) {
        self.corner_sharp = cloud;
    }

    /// Set the less-sharp corner cloud for the current sweep.
    pub fn update_corner_points_less_sharp(&mut self, cloud: FeatureCloud) {
        self.corner_less_sharp = cloud;
    }

    /// Set the flat surface cloud for the current sweep.
    pub fn update_surf_points_flat(&mut self, cloud: FeatureCloud) {
        self.surf_flat = cloud;
    }

    /// Set the less-flat surface cloud for the current sweep.
    pub fn update_surf_points_less_flat(&mut self, cloud: FeatureCloud) {
        self.surf_less_flat = cloud;
    }

    /// Set the inertial packet for the current sweep.
    ///
    /// # Panics
    ///
    /// Panics when the packet does not hold exactly four rows.
    pub fn update_imu(&mut self, packet: &[Vector3]) {
        self.imu = ImuState::from_packet(packet);
    }

    /// The accumulated world pose at the last sweep end.
    pub fn transform_sum(&self) -> &Pose6D {
        &self.transform_sum
    }

    /// The last inter-sweep motion increment.
    pub fn transform(&self) -> &Pose6D {
        &self.transform
    }

    /// Corner features of the previous sweep, projected to its end.
    pub fn last_corner_cloud(&self) -> &FeatureCloud {
        &self.last_corner
    }

    /// Surface features of the previous sweep, projected to its end.
    pub fn last_surface_cloud(&self) -> &FeatureCloud {
        &self.last_surface
    }

    /// Sweeps processed since initialization.
    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    /// Run one sweep end-to-end.
    ///
    /// The first call only initializes: it installs the less-sharp and
    /// less-flat clouds as matching targets, seeds the world attitude from
    /// the IMU start attitude and returns. Every later call refines the
    /// inter-sweep motion, accumulates the world pose and rotates the
    /// buffers for the next sweep.
    pub fn process(&mut self) -> SweepSummary {
        if !self.initialized {
            self.initialize();
            return SweepSummary::default();
        }

        self.frame_count += 1;

        // Seed with the previous motion minus its constant-velocity part;
        // what remains is the acceleration-induced drift the solver has to
        // find.
        self.transform.pos -= self.imu.velo_from_start * self.config.scan_period;

        let summary = if self.last_corner.len() > MIN_CORNER_POINTS
            && self.last_surface.len() > MIN_SURFACE_POINTS
        {
            self.refine_transform()
        } else {
            log::debug!(
                "skipping matching: {} corner / {} surface target points",
                self.last_corner.len(),
                self.last_surface.len()
            );
            SweepSummary::default()
        };

        self.accumulate_pose();
        self.rotate_buffers();

        log::debug!(
            "sweep {}: {} iterations, {} correspondences, pos=({:.3}, {:.3}, {:.3})",
            self.frame_count,
            summary.iterations,
            summary.correspondences,
            self.transform_sum.pos.x,
            self.transform_sum.pos.y,
            self.transform_sum.pos.z,
        );

        summary
    }

    /// First-sweep setup: install targets, build the index, seed attitude.
    fn initialize(&mut self) {
        std::mem::swap(&mut self.corner_less_sharp, &mut self.last_corner);
        std::mem::swap(&mut self.surf_less_flat, &mut self.last_surface);
        self.last_corner_tree = build_kdtree(&self.last_corner);
        self.last_surface_tree = build_kdtree(&self.last_surface);

        self.transform_sum.rot_x += self.imu.pitch_start;
        self.transform_sum.rot_z += self.imu.roll_start;

        self.initialized = true;
        log::debug!(
            "initialized with {} corner / {} surface target points",
            self.last_corner.len(),
            self.last_surface.len()
        );
    }

    /// Gauss-Newton refinement of the inter-sweep motion.
    fn refine_transform(&mut self) -> SweepSummary {
        self.corner_sharp.retain_finite();
        self.surf_flat.retain_finite();

        self.corner_matches.clear();
        self.corner_matches.resize(self.corner_sharp.len(), None);
        self.surface_matches.clear();
        self.surface_matches.resize(self.surf_flat.len(), None);

        let mut summary = SweepSummary::default();
        let mut projector = Matrix6::identity();
        let mut is_degenerate = false;

        for iter in 0..self.config.max_iterations {
            summary.iterations = iter + 1;
            let refresh = iter % MATCH_REFRESH_INTERVAL == 0;
            let weighted = iter >= WEIGHTING_START_ITER;

            self.selected_points.clear();
            self.selected_coeffs.clear();
            self.collect_edge_terms(refresh, weighted);
            self.collect_plane_terms(refresh, weighted);
            summary.correspondences = self.selected_points.len();

            if self.selected_points.len() < MIN_CORRESPONDENCES {
                continue;
            }

            let (ata, atb) =
                build_normal_equations(&self.selected_points, &self.selected_coeffs, &self.transform);
            let Some(mut x) = solve(&ata, &atb) else {
                log::warn!("singular normal matrix at iteration {iter}, aborting refinement");
                break;
            };

            if iter == 0 {
                if let Some(p) = degeneracy_projector(&ata, EIGEN_THRESHOLD) {
                    log::debug!("degenerate geometry, constraining update to observable subspace");
                    projector = p;
                    is_degenerate = true;
                }
            }
            if is_degenerate {
                x = projector * x;
            }

            self.apply_update(&x);

            let delta_r = (x[0].to_degrees().powi(2)
                + x[1].to_degrees().powi(2)
                + x[2].to_degrees().powi(2))
            .sqrt();
            let delta_t =
                ((x[3] * 100.0).powi(2) + (x[4] * 100.0).powi(2) + (x[5] * 100.0).powi(2)).sqrt();
            if delta_r < self.config.delta_r_abort && delta_t < self.config.delta_t_abort {
                summary.converged = true;
                break;
            }
        }

        summary.degenerate = is_degenerate;
        summary
    }

    /// Select edge correspondences and their residual terms.
    fn collect_edge_terms(&mut self, refresh: bool, weighted: bool) {
        for i in 0..self.corner_sharp.len() {
            let point = self.corner_sharp.points[i];
            let query =
                project_to_start(&point, &self.transform, self.config.scan_period).position();

            if refresh {
                self.corner_matches[i] =
                    find_edge_pair(&query, &self.last_corner, &self.last_corner_tree);
            }
            if let Some((a, b)) = self.corner_matches[i] {
                let coeff = edge_coefficient(
                    &query,
                    &self.last_corner.points[a],
                    &self.last_corner.points[b],
                    weighted,
                );
                if let Some(coeff) = coeff {
                    self.selected_points.push(point);
                    self.selected_coeffs.push(coeff);
                }
            }
        }
    }

    /// Select planar correspondences and their residual terms.
    fn collect_plane_terms(&mut self, refresh: bool, weighted: bool) {
        for i in 0..self.surf_flat.len() {
            let point = self.surf_flat.points[i];
            let query =
                project_to_start(&point, &self.transform, self.config.scan_period).position();

            if refresh {
                self.surface_matches[i] =
                    find_plane_triple(&query, &self.last_surface, &self.last_surface_tree);
            }
            if let Some((a, b, c)) = self.surface_matches[i] {
                let coeff = plane_coefficient(
                    &query,
                    &self.last_surface.points[a],
                    &self.last_surface.points[b],
                    &self.last_surface.points[c],
                    weighted,
                );
                if let Some(coeff) = coeff {
                    self.selected_points.push(point);
                    self.selected_coeffs.push(coeff);
                }
            }
        }
    }

    /// Apply the solved increment; non-finite components reset to zero.
    fn apply_update(&mut self, x: &Vector6<f32>) {
        self.transform.rot_x = sanitized_angle(self.transform.rot_x.rad() + x[0]);
        self.transform.rot_y = sanitized_angle(self.transform.rot_y.rad() + x[1]);
        self.transform.rot_z = sanitized_angle(self.transform.rot_z.rad() + x[2]);
        self.transform.pos.x = sanitized(self.transform.pos.x + x[3]);
        self.transform.pos.y = sanitized(self.transform.pos.y + x[4]);
        self.transform.pos.z = sanitized(self.transform.pos.z + x[5]);
    }

    /// Fold the refined increment and the inertial correction into the
    /// world pose.
    fn accumulate_pose(&mut self) {
        let (rx, ry, rz) = accumulate_rotation(
            self.transform_sum.rot_x,
            self.transform_sum.rot_y,
            self.transform_sum.rot_z,
            -self.transform.rot_x,
            Angle::new(-self.transform.rot_y.rad() * VERTICAL_GAIN),
            -self.transform.rot_z,
        );

        let mut v = Vector3::new(
            self.transform.pos.x - self.imu.shift_from_start.x,
            self.transform.pos.y - self.imu.shift_from_start.y,
            self.transform.pos.z * VERTICAL_GAIN - self.imu.shift_from_start.z,
        );
        rotate_zxy(&mut v, rz, rx, ry);
        let pos = self.transform_sum.pos - v;

        let (rx, ry, rz) = plugin_imu_rotation(
            rx,
            ry,
            rz,
            self.imu.pitch_start,
            self.imu.yaw_start,
            self.imu.roll_start,
            self.imu.pitch_end,
            self.imu.yaw_end,
            self.imu.roll_end,
        );

        self.transform_sum = Pose6D {
            rot_x: rx,
            rot_y: ry,
            rot_z: rz,
            pos,
        };
    }

    /// Project the carry-over clouds to the sweep end, swap them into the
    /// target slots and rebuild the index when they are large enough.
    fn rotate_buffers(&mut self) {
        project_cloud_to_end(
            &mut self.corner_less_sharp,
            &self.transform,
            &self.imu,
            self.config.scan_period,
        );
        project_cloud_to_end(
            &mut self.surf_less_flat,
            &self.transform,
            &self.imu,
            self.config.scan_period,
        );

        std::mem::swap(&mut self.corner_less_sharp, &mut self.last_corner);
        std::mem::swap(&mut self.surf_less_flat, &mut self.last_surface);

        if self.last_corner.len() > MIN_CORNER_POINTS && self.last_surface.len() > MIN_SURFACE_POINTS
        {
            self.last_corner_tree = build_kdtree(&self.last_corner);
            self.last_surface_tree = build_kdtree(&self.last_surface);
        }
    }
}

#[inline]
fn sanitized(value: f32) -> f32 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

#[inline]
fn sanitized_angle(rad: f32) -> Angle {
    if rad.is_finite() {
        Angle::new(rad)
    } else {
        Angle::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = LaserOdometryConfig::default();
        assert_eq!(config.scan_period, 0.1);
        assert_eq!(config.max_iterations, 25);
        assert_eq!(config.delta_t_abort, 0.1);
        assert_eq!(config.delta_r_abort, 0.1);
    }

    #[test]
    fn test_sanitized_resets_non_finite() {
        assert_eq!(sanitized(1.5), 1.5);
        assert_eq!(sanitized(f32::NAN), 0.0);
        assert_eq!(sanitized(f32::INFINITY), 0.0);
        assert_eq!(sanitized_angle(f32::NAN).rad(), 0.0);
        assert_eq!(sanitized_angle(0.3).rad(), 0.3);
    }

    #[test]
    fn test_first_sweep_initializes_only() {
        let mut odometry = LaserOdometry::new(LaserOdometryConfig::default());
        let mut corners = FeatureCloud::new();
        corners.push(FeaturePoint::new(1.0, 0.0, 0.0, 0.0));
        odometry.update_corner_points_less_sharp(corners);

        let summary = odometry.process();
        assert_eq!(summary.iterations, 0);
        assert_eq!(odometry.frame_count(), 0);
        assert_eq!(odometry.last_corner_cloud().len(), 1);
        assert_eq!(odometry.transform().pos, Vector3::zero());
    }

    #[test]
    fn test_small_targets_skip_matching_but_track_imu() {
        let mut odometry = LaserOdometry::new(LaserOdometryConfig::default());
        odometry.process(); // initialize with empty clouds

        let packet = [
            Vector3::zero(),
            Vector3::zero(),
            Vector3::zero(),
            Vector3::new(1.0, 0.0, 0.0), // constant 1 m/s drift
        ];
        odometry.update_imu(&packet);

        let summary = odometry.process();
        assert_eq!(summary.iterations, 0);
        assert_eq!(odometry.frame_count(), 1);
        // The velocity seed still enters the increment and the world pose.
        approx::assert_relative_eq!(odometry.transform().pos.x, -0.1, epsilon = 1e-6);
        approx::assert_relative_eq!(odometry.transform_sum().pos.x, 0.1, epsilon = 1e-6);
    }
}
