//! Mathematical primitives for rigid-motion estimation.
//!
//! Angles with cached trigonometry, fixed-axis rotation operators, and the
//! closed-form Euler compositions used by the pose accumulator.

use serde::{Deserialize, Serialize};

use crate::core::types::Vector3;

/// An angle in radians with eagerly cached sine and cosine.
///
/// The rotation operators below consume the cached values, so a point
/// rotation never recomputes trigonometry. Invariant: `sin² + cos² ≈ 1`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "f32", into = "f32")]
pub struct Angle {
    rad: f32,
    sin: f32,
    cos: f32,
}

impl Angle {
    /// Create an angle from radians, caching its sine and cosine.
    #[inline]
    pub fn new(rad: f32) -> Self {
        let (sin, cos) = rad.sin_cos();
        Self { rad, sin, cos }
    }

    /// Create an angle from degrees.
    #[inline]
    pub fn from_degrees(deg: f32) -> Self {
        Self::new(deg.to_radians())
    }

    /// The angle in radians.
    #[inline]
    pub fn rad(&self) -> f32 {
        self.rad
    }

    /// The angle in degrees.
    #[inline]
    pub fn deg(&self) -> f32 {
        self.rad.to_degrees()
    }

    /// Cached sine.
    #[inline]
    pub fn sin(&self) -> f32 {
        self.sin
    }

    /// Cached cosine.
    #[inline]
    pub fn cos(&self) -> f32 {
        self.cos
    }
}

impl Default for Angle {
    fn default() -> Self {
        Self {
            rad: 0.0,
            sin: 0.0,
            cos: 1.0,
        }
    }
}

impl From<f32> for Angle {
    fn from(rad: f32) -> Self {
        Self::new(rad)
    }
}

impl From<Angle> for f32 {
    fn from(angle: Angle) -> Self {
        angle.rad
    }
}

impl std::ops::Neg for Angle {
    type Output = Angle;

    #[inline]
    fn neg(self) -> Angle {
        Angle {
            rad: -self.rad,
            sin: -self.sin,
            cos: self.cos,
        }
    }
}

impl std::ops::Add for Angle {
    type Output = Angle;

    #[inline]
    fn add(self, other: Angle) -> Angle {
        Angle::new(self.rad + other.rad)
    }
}

impl std::ops::AddAssign for Angle {
    #[inline]
    fn add_assign(&mut self, other: Angle) {
        *self = Angle::new(self.rad + other.rad);
    }
}

/// Rotate `v` in place around the X axis.
#[inline]
pub fn rot_x(v: &mut Vector3, ang: Angle) {
    let y = v.y;
    v.y = ang.cos() * y - ang.sin() * v.z;
    v.z = ang.sin() * y + ang.cos() * v.z;
}

/// Rotate `v` in place around the Y axis.
#[inline]
pub fn rot_y(v: &mut Vector3, ang: Angle) {
    let x = v.x;
    v.x = ang.cos() * x + ang.sin() * v.z;
    v.z = ang.cos() * v.z - ang.sin() * x;
}

/// Rotate `v` in place around the Z axis.
#[inline]
pub fn rot_z(v: &mut Vector3, ang: Angle) {
    let x = v.x;
    v.x = ang.cos() * x - ang.sin() * v.y;
    v.y = ang.sin() * x + ang.cos() * v.y;
}

/// Rotate `v` in place around Z, then X, then Y (fixed axes).
#[inline]
pub fn rotate_zxy(v: &mut Vector3, ang_z: Angle, ang_x: Angle, ang_y: Angle) {
    rot_z(v, ang_z);
    rot_x(v, ang_x);
    rot_y(v, ang_y);
}

/// Rotate `v` in place around Y, then X, then Z (fixed axes).
///
/// Inverse of [`rotate_zxy`] when called with the negated angles in the
/// mirrored order.
#[inline]
pub fn rotate_yxz(v: &mut Vector3, ang_y: Angle, ang_x: Angle, ang_z: Angle) {
    rot_y(v, ang_y);
    rot_x(v, ang_x);
    rot_z(v, ang_z);
}

/// Compose two rotations given as ZXY-ordered Euler triples.
///
/// Returns the Euler triple of `R(cx, cy, cz) · R(lx, ly, lz)`, re-extracted
/// in the same convention. Equivalent to multiplying the rotation matrices
/// and decomposing the product, but in closed form.
pub fn accumulate_rotation(
    cx: Angle,
    cy: Angle,
    cz: Angle,
    lx: Angle,
    ly: Angle,
    lz: Angle,
) -> (Angle, Angle, Angle) {
    let srx = lx.cos() * cx.cos() * ly.sin() * cz.sin()
        - cx.cos() * cz.cos() * lx.sin()
        - lx.cos() * ly.cos() * cx.sin();
    // Clamp keeps asin finite when rounding pushes the argument past ±1.
    let ox = Angle::new(-srx.clamp(-1.0, 1.0).asin());

    let srycrx = lx.sin() * (cy.cos() * cz.sin() - cz.cos() * cx.sin() * cy.sin())
        + lx.cos() * ly.sin() * (cy.cos() * cz.cos() + cx.sin() * cy.sin() * cz.sin())
        + lx.cos() * ly.cos() * cx.cos() * cy.sin();
    let crycrx = lx.cos() * ly.cos() * cx.cos() * cy.cos()
        - lx.cos() * ly.sin() * (cz.cos() * cy.sin() - cy.cos() * cx.sin() * cz.sin())
        - lx.sin() * (cy.sin() * cz.sin() + cy.cos() * cz.cos() * cx.sin());
    let oy = Angle::new((srycrx / ox.cos()).atan2(crycrx / ox.cos()));

    let srzcrx = cx.sin() * (lz.cos() * ly.sin() - ly.cos() * lx.sin() * lz.sin())
        + cx.cos() * cz.sin() * (ly.cos() * lz.cos() + lx.sin() * ly.sin() * lz.sin())
        + lx.cos() * cx.cos() * cz.cos() * lz.sin();
    let crzcrx = lx.cos() * lz.cos() * cx.cos() * cz.cos()
        - cx.cos() * cz.sin() * (ly.cos() * lz.sin() - lz.cos() * lx.sin() * ly.sin())
        - cx.sin() * (ly.sin() * lz.sin() + ly.cos() * lz.cos() * lx.sin());
    let oz = Angle::new((srzcrx / ox.cos()).atan2(crzcrx / ox.cos()));

    (ox, oy, oz)
}

/// Correct an estimated attitude by the rotation the IMU observed between
/// sweep start and sweep end.
///
/// `bc*` is the current attitude estimate, `bl*` the IMU attitude at sweep
/// start and `al*` at sweep end; all triples are (pitch, yaw, roll) about
/// (X, Y, Z). With `bl == al` the input attitude comes back unchanged.
#[allow(clippy::too_many_arguments)]
pub fn plugin_imu_rotation(
    bcx: Angle,
    bcy: Angle,
    bcz: Angle,
    blx: Angle,
    bly: Angle,
    blz: Angle,
    alx: Angle,
    aly: Angle,
    alz: Angle,
) -> (Angle, Angle, Angle) {
    let (sbcx, cbcx) = (bcx.sin(), bcx.cos());
    let (sbcy, cbcy) = (bcy.sin(), bcy.cos());
    let (sbcz, cbcz) = (bcz.sin(), bcz.cos());

    let (sblx, cblx) = (blx.sin(), blx.cos());
    let (sbly, cbly) = (bly.sin(), bly.cos());
    let (sblz, cblz) = (blz.sin(), blz.cos());

    let (salx, calx) = (alx.sin(), alx.cos());
    let (saly, caly) = (aly.sin(), aly.cos());
    let (salz, calz) = (alz.sin(), alz.cos());

    let srx = -sbcx * (salx * sblx + calx * caly * cblx * cbly + calx * cblx * saly * sbly)
        - cbcx
            * cbcz
            * (calx * saly * (cbly * sblz - cblz * sblx * sbly)
                - calx * caly * (sbly * sblz + cbly * cblz * sblx)
                + cblx * cblz * salx)
        - cbcx
            * sbcz
            * (calx * caly * (cblz * sbly - cbly * sblx * sblz)
                - calx * saly * (cbly * cblz + sblx * sbly * sblz)
                + cblx * salx * sblz);
    let acx = Angle::new(-srx.clamp(-1.0, 1.0).asin());

    let srycrx = (cbcy * sbcz - cbcz * sbcx * sbcy)
        * (calx * saly * (cbly * sblz - cblz * sblx * sbly)
            - calx * caly * (sbly * sblz + cbly * cblz * sblx)
            + cblx * cblz * salx)
        - (cbcy * cbcz + sbcx * sbcy * sbcz)
            * (calx * caly * (cblz * sbly - cbly * sblx * sblz)
                - calx * saly * (cbly * cblz + sblx * sbly * sblz)
                + cblx * salx * sblz)
        + cbcx * sbcy * (salx * sblx + calx * caly * cblx * cbly + calx * cblx * saly * sbly);
    let crycrx = (cbcz * sbcy - cbcy * sbcx * sbcz)
        * (calx * caly * (cblz * sbly - cbly * sblx * sblz)
            - calx * saly * (cbly * cblz + sblx * sbly * sblz)
            + cblx * salx * sblz)
        - (sbcy * sbcz + cbcy * cbcz * sbcx)
            * (calx * saly * (cbly * sblz - cblz * sblx * sbly)
                - calx * caly * (sbly * sblz + cbly * cblz * sblx)
                + cblx * cblz * salx)
        + cbcx * cbcy * (salx * sblx + calx * caly * cblx * cbly + calx * cblx * saly * sbly);
    let acy = Angle::new((srycrx / acx.cos()).atan2(crycrx / acx.cos()));

    let srzcrx = sbcx
        * (cblx * cbly * (calz * saly - caly * salx * salz)
            - cblx * sbly * (caly * calz + salx * saly * salz)
            + calx * salz * sblx)
        - cbcx
            * cbcz
            * ((caly * calz + salx * saly * salz) * (cbly * sblz - cblz * sblx * sbly)
                + (calz * saly - caly * salx * salz) * (sbly * sblz + cbly * cblz * sblx)
                - calx * cblx * cblz * salz)
        + cbcx
            * sbcz
            * ((caly * calz + salx * saly * salz) * (cbly * cblz + sblx * sbly * sblz)
                + (calz * saly - caly * salx * salz) * (cblz * sbly - cbly * sblx * sblz)
                + calx * cblx * salz * sblz);
    let crzcrx = sbcx
        * (cblx * sbly * (caly * salz - calz * salx * saly)
            - cblx * cbly * (saly * salz + caly * calz * salx)
            + calx * calz * sblx)
        + cbcx
            * cbcz
            * ((saly * salz + caly * calz * salx) * (sbly * sblz + cbly * cblz * sblx)
                + (caly * salz - calz * salx * saly) * (cbly * sblz - cblz * sblx * sbly)
                + calx * calz * cblx * cblz)
        - cbcx
            * sbcz
            * ((saly * salz + caly * calz * salx) * (cblz * sbly - cbly * sblx * sblz)
                + (caly * salz - calz * salx * saly) * (cbly * cblz + sblx * sbly * sblz)
                - calx * calz * cblx * sblz);
    let acz = Angle::new((srzcrx / acx.cos()).atan2(crzcrx / acx.cos()));

    (acx, acy, acz)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f32::consts::{FRAC_PI_2, PI};

    #[test]
    fn test_angle_caches_trig() {
        let a = Angle::new(0.7);
        assert_relative_eq!(a.sin(), 0.7f32.sin());
        assert_relative_eq!(a.cos(), 0.7f32.cos());
        assert_relative_eq!(a.sin() * a.sin() + a.cos() * a.cos(), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_angle_default_is_zero() {
        let a = Angle::default();
        assert_eq!(a.rad(), 0.0);
        assert_eq!(a.sin(), 0.0);
        assert_eq!(a.cos(), 1.0);
    }

    #[test]
    fn test_angle_neg() {
        let a = Angle::new(0.3);
        let n = -a;
        assert_relative_eq!(n.rad(), -0.3);
        assert_relative_eq!(n.sin(), -a.sin());
        assert_relative_eq!(n.cos(), a.cos());
    }

    #[test]
    fn test_rot_z_quarter_turn() {
        let mut v = Vector3::new(1.0, 0.0, 0.0);
        rot_z(&mut v, Angle::new(FRAC_PI_2));
        assert_relative_eq!(v.x, 0.0, epsilon = 1e-6);
        assert_relative_eq!(v.y, 1.0, epsilon = 1e-6);
        assert_relative_eq!(v.z, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_rotate_zxy_yxz_roundtrip() {
        let (x, y, z) = (Angle::new(0.2), Angle::new(-0.5), Angle::new(1.1));
        let mut v = Vector3::new(1.0, -2.0, 3.0);
        rotate_zxy(&mut v, z, x, y);
        rotate_yxz(&mut v, -y, -x, -z);
        assert_relative_eq!(v.x, 1.0, epsilon = 1e-5);
        assert_relative_eq!(v.y, -2.0, epsilon = 1e-5);
        assert_relative_eq!(v.z, 3.0, epsilon = 1e-5);
    }

    #[test]
    fn test_accumulate_rotation_identity() {
        let zero = Angle::default();
        let (ox, oy, oz) = accumulate_rotation(
            Angle::new(0.3),
            Angle::new(-0.2),
            Angle::new(0.9),
            zero,
            zero,
            zero,
        );
        assert_relative_eq!(ox.rad(), 0.3, epsilon = 1e-5);
        assert_relative_eq!(oy.rad(), -0.2, epsilon = 1e-5);
        assert_relative_eq!(oz.rad(), 0.9, epsilon = 1e-5);
    }

    #[test]
    fn test_accumulate_rotation_matches_applied_rotations() {
        // Composing the Euler triples must act on vectors exactly like
        // applying the two ZXY rotations in sequence.
        let (cx, cy, cz) = (Angle::new(0.4), Angle::new(-0.3), Angle::new(0.25));
        let (lx, ly, lz) = (Angle::new(-0.15), Angle::new(0.5), Angle::new(0.1));
        let (ox, oy, oz) = accumulate_rotation(cx, cy, cz, lx, ly, lz);

        let mut sequential = Vector3::new(0.7, -1.3, 2.1);
        rotate_zxy(&mut sequential, lz, lx, ly);
        rotate_zxy(&mut sequential, cz, cx, cy);

        let mut composed = Vector3::new(0.7, -1.3, 2.1);
        rotate_zxy(&mut composed, oz, ox, oy);

        assert_relative_eq!(sequential.x, composed.x, epsilon = 1e-5);
        assert_relative_eq!(sequential.y, composed.y, epsilon = 1e-5);
        assert_relative_eq!(sequential.z, composed.z, epsilon = 1e-5);
    }

    #[test]
    fn test_plugin_imu_rotation_no_drift() {
        // Identical start and end IMU attitudes leave the estimate untouched.
        let (bx, by, bz) = (Angle::new(0.2), Angle::new(0.6), Angle::new(-0.4));
        let (ix, iy, iz) = (Angle::new(0.05), Angle::new(-0.3), Angle::new(0.12));
        let (ax, ay, az) = plugin_imu_rotation(bx, by, bz, ix, iy, iz, ix, iy, iz);
        assert_relative_eq!(ax.rad(), bx.rad(), epsilon = 1e-5);
        assert_relative_eq!(ay.rad(), by.rad(), epsilon = 1e-5);
        assert_relative_eq!(az.rad(), bz.rad(), epsilon = 1e-5);
    }

    #[test]
    fn test_accumulate_rotation_near_gimbal_lock() {
        // The clamped asin must stay finite when the pitch approaches ±π/2.
        let (ox, oy, oz) = accumulate_rotation(
            Angle::new(FRAC_PI_2 - 1e-4),
            Angle::default(),
            Angle::default(),
            Angle::new(1e-4),
            Angle::default(),
            Angle::default(),
        );
        assert!(ox.rad().is_finite());
        assert!(oy.rad().is_finite());
        assert!(oz.rad().is_finite());
        assert!(ox.rad().abs() <= PI);
    }
}
