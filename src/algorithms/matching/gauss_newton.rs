//! Normal-equation assembly and the degeneracy-aware Gauss-Newton step.
//!
//! Each selected correspondence contributes one row: the closed-form
//! partials of the ZXY-rotated query point with respect to the six unknowns
//! (rx, ry, rz, tx, ty, tz), dotted with the weighted residual gradient.
//! The partials act on the original, non-deskewed query point; the residual
//! was evaluated on the deskewed one.

use nalgebra::{Matrix6, RowVector6, Vector6};

use super::residual::Coefficient;
use crate::core::types::{FeaturePoint, Pose6D};

/// Fixed under-relaxation of the right-hand side. Acts as implicit damping;
/// the convergence thresholds are tuned against it.
const STEP_SCALE: f32 = 0.05;

/// Eigenvalue floor below which a direction of the normal matrix counts as
/// unobservable.
pub const EIGEN_THRESHOLD: f32 = 10.0;

/// Accumulate `AᵀA` and `Aᵀb` over the selected correspondences.
///
/// `points` are the original query points and `coeffs` their weighted
/// residual gradients; both slices run in lockstep.
pub fn build_normal_equations(
    points: &[FeaturePoint],
    coeffs: &[Coefficient],
    transform: &Pose6D,
) -> (Matrix6<f32>, Vector6<f32>) {
    debug_assert_eq!(points.len(), coeffs.len());

    let (srx, crx) = (transform.rot_x.sin(), transform.rot_x.cos());
    let (sry, cry) = (transform.rot_y.sin(), transform.rot_y.cos());
    let (srz, crz) = (transform.rot_z.sin(), transform.rot_z.cos());
    let (tx, ty, tz) = (transform.pos.x, transform.pos.y, transform.pos.z);

    let mut ata = Matrix6::zeros();
    let mut atb = Vector6::zeros();

    for (point, coeff) in points.iter().zip(coeffs) {
        let (px, py, pz) = (point.x, point.y, point.z);
        let g = coeff.grad;

        let arx = (-crx * sry * srz * px + crx * crz * sry * py + srx * sry * pz
            + tx * crx * sry * srz
            - ty * crx * crz * sry
            - tz * srx * sry)
            * g.x
            + (srx * srz * px - crz * srx * py + crx * pz + ty * crz * srx
                - tz * crx
                - tx * srx * srz)
                * g.y
            + (crx * cry * srz * px - crx * cry * crz * py - cry * srx * pz
                + tz * cry * srx
                + ty * crx * cry * crz
                - tx * crx * cry * srz)
                * g.z;

        // The y-gradient term vanishes symbolically for the yaw partial.
        let ary = ((-crz * sry - cry * srx * srz) * px + (cry * crz * srx - sry * srz) * py
            - crx * cry * pz
            + tx * (crz * sry + cry * srx * srz)
            + ty * (sry * srz - cry * crz * srx)
            + tz * crx * cry)
            * g.x
            + ((cry * crz - srx * sry * srz) * px
                + (cry * srz + crz * srx * sry) * py
                - crx * sry * pz
                + tz * crx * sry
                - ty * (cry * srz + crz * srx * sry)
                - tx * (cry * crz - srx * sry * srz))
                * g.z;

        let arz = ((-cry * srz - crz * srx * sry) * px + (cry * crz - srx * sry * srz) * py
            + tx * (cry * srz + crz * srx * sry)
            - ty * (cry * crz - srx * sry * srz))
            * g.x
            + (-crx * crz * px - crx * srz * py + ty * crx * srz + tx * crx * crz) * g.y
            + ((cry * crz * srx - sry * srz) * px
                + (crz * sry + cry * srx * srz) * py
                + tx * (sry * srz - cry * crz * srx)
                - ty * (crz * sry + cry * srx * srz))
                * g.z;

        let atx = -(cry * crz - srx * sry * srz) * g.x + crx * srz * g.y
            - (crz * sry + cry * srx * srz) * g.z;

        let aty = -(cry * srz + crz * srx * sry) * g.x
            - crx * crz * g.y
            - (sry * srz - cry * crz * srx) * g.z;

        let atz = crx * sry * g.x - srx * g.y - crx * cry * g.z;

        let row = Vector6::new(arx, ary, arz, atx, aty, atz);
        ata += row * row.transpose();
        atb += row * (-STEP_SCALE * coeff.residual);
    }

    (ata, atb)
}

/// Solve the normal equations by column-pivoted QR.
///
/// Returns `None` when the factorization meets an exactly singular pivot.
pub fn solve(ata: &Matrix6<f32>, atb: &Vector6<f32>) -> Option<Vector6<f32>> {
    ata.col_piv_qr().solve(atb)
}

/// Build the projector applied to updates once the geometry is flagged
/// degenerate.
///
/// Eigen-decomposes the normal matrix into `V` with eigenvector columns
/// sorted ascending by eigenvalue, then zeros the coordinate row of `V′`
/// (a copy of `V`) at each failing eigenvalue's rank; the scan stops at the
/// first eigenvalue meeting `threshold`. The projector is `P = V⁻¹ · V′`.
/// Returns `None` when the smallest eigenvalue already passes, i.e. the
/// geometry fully constrains all six degrees of freedom.
pub fn degeneracy_projector(ata: &Matrix6<f32>, threshold: f32) -> Option<Matrix6<f32>> {
    let eigen = ata.symmetric_eigen();

    let mut order = [0usize; 6];
    for (slot, index) in order.iter_mut().enumerate() {
        *index = slot;
    }
    order.sort_by(|&a, &b| eigen.eigenvalues[a].total_cmp(&eigen.eigenvalues[b]));

    // Eigenvector matrix with columns sorted ascending by eigenvalue.
    let mut basis = Matrix6::zeros();
    for (col, &k) in order.iter().enumerate() {
        basis.set_column(col, &eigen.eigenvectors.column(k));
    }

    // Zero the coordinate row at each failing eigenvalue's rank, not the
    // eigenvector column itself.
    let mut masked = basis;
    let mut degenerate = false;
    for (rank, &k) in order.iter().enumerate() {
        if eigen.eigenvalues[k] >= threshold {
            break;
        }
        masked.set_row(rank, &RowVector6::zeros());
        degenerate = true;
    }
    if !degenerate {
        return None;
    }

    // The basis columns are orthonormal, so its inverse is the transpose.
    Some(basis.transpose() * masked)
}
