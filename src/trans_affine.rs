//! Affine transformation matrices.
//!
//! [`TransAffine`] is the f64 matrix callers hand to gradient and texture
//! setters. Textures keep their inverse as a [`FixedAffine`] (16.16 fixed
//! point) together with a [`TransformClass`] hint that lets the sampler skip
//! work for translate-only and axis-aligned mappings.

use crate::basics::{to_fixed64, FIXED_ONE};

/// Epsilon for degenerate-determinant checks.
pub const AFFINE_EPSILON: f64 = 1e-12;

/// 2D affine transformation matrix.
///
/// ```text
///   | sx  shx tx |
///   | shy  sy ty |
///   |  0    0  1 |
/// ```
///
/// Transform: `x' = x*sx + y*shx + tx`, `y' = x*shy + y*sy + ty`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransAffine {
    pub sx: f64,
    pub shy: f64,
    pub shx: f64,
    pub sy: f64,
    pub tx: f64,
    pub ty: f64,
}

impl Default for TransAffine {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl TransAffine {
    pub const IDENTITY: TransAffine = TransAffine {
        sx: 1.0,
        shy: 0.0,
        shx: 0.0,
        sy: 1.0,
        tx: 0.0,
        ty: 0.0,
    };

    /// Custom matrix from six components.
    pub fn new_custom(sx: f64, shy: f64, shx: f64, sy: f64, tx: f64, ty: f64) -> Self {
        Self {
            sx,
            shy,
            shx,
            sy,
            tx,
            ty,
        }
    }

    pub fn new_rotation(a: f64) -> Self {
        let (sa, ca) = a.sin_cos();
        Self::new_custom(ca, sa, -sa, ca, 0.0, 0.0)
    }

    pub fn new_scaling(x: f64, y: f64) -> Self {
        Self::new_custom(x, 0.0, 0.0, y, 0.0, 0.0)
    }

    pub fn new_translation(x: f64, y: f64) -> Self {
        Self::new_custom(1.0, 0.0, 0.0, 1.0, x, y)
    }

    /// Post-multiply: `self = self * m` (apply `self`, then `m`).
    pub fn multiply(&mut self, m: &TransAffine) -> &mut Self {
        let t0 = self.sx * m.sx + self.shy * m.shx;
        let t2 = self.shx * m.sx + self.sy * m.shx;
        let t4 = self.tx * m.sx + self.ty * m.shx + m.tx;
        self.shy = self.sx * m.shy + self.shy * m.sy;
        self.sy = self.shx * m.shy + self.sy * m.sy;
        self.ty = self.tx * m.shy + self.ty * m.sy + m.ty;
        self.sx = t0;
        self.shx = t2;
        self.tx = t4;
        self
    }

    /// Determinant of the 2x2 portion.
    #[inline]
    pub fn determinant(&self) -> f64 {
        self.sx * self.sy - self.shy * self.shx
    }

    /// The inverse matrix, or `None` when the matrix is singular or not finite.
    pub fn inverted(&self) -> Option<TransAffine> {
        let det = self.determinant();
        if !det.is_finite() || det.abs() < AFFINE_EPSILON {
            return None;
        }
        let d = 1.0 / det;
        let sx = self.sy * d;
        let sy = self.sx * d;
        let shy = -self.shy * d;
        let shx = -self.shx * d;
        let tx = -self.tx * sx - self.ty * shx;
        let ty = -self.tx * shy - self.ty * sy;
        let inv = TransAffine::new_custom(sx, shy, shx, sy, tx, ty);
        if [inv.sx, inv.shy, inv.shx, inv.sy, inv.tx, inv.ty]
            .iter()
            .all(|v| v.is_finite())
        {
            Some(inv)
        } else {
            None
        }
    }

    /// Forward transform of a point.
    #[inline]
    pub fn transform(&self, x: f64, y: f64) -> (f64, f64) {
        (
            x * self.sx + y * self.shx + self.tx,
            x * self.shy + y * self.sy + self.ty,
        )
    }
}

// ============================================================================
// Fixed-point affine
// ============================================================================

/// Classification of a transform, used to pick a cheaper sampling loop.
///
/// This is a hint only; every class produces the same texels as `Generic`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformClass {
    Identity,
    Translate,
    ScaleTranslate,
    Generic,
}

/// Affine transform with 16.16 fixed-point coefficients.
///
/// Layout follows the source-space mapping
/// `u = m00*x + m01*y + m02`, `v = m10*x + m11*y + m12`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedAffine {
    pub m00: i64,
    pub m01: i64,
    pub m02: i64,
    pub m10: i64,
    pub m11: i64,
    pub m12: i64,
}

impl FixedAffine {
    pub const IDENTITY: FixedAffine = FixedAffine {
        m00: FIXED_ONE as i64,
        m01: 0,
        m02: 0,
        m10: 0,
        m11: FIXED_ONE as i64,
        m12: 0,
    };

    pub fn from_affine(m: &TransAffine) -> Self {
        Self {
            m00: to_fixed64(m.sx),
            m01: to_fixed64(m.shx),
            m02: to_fixed64(m.tx),
            m10: to_fixed64(m.shy),
            m11: to_fixed64(m.sy),
            m12: to_fixed64(m.ty),
        }
    }

    pub fn classify(&self) -> TransformClass {
        let one = FIXED_ONE as i64;
        if self.m01 != 0 || self.m10 != 0 {
            TransformClass::Generic
        } else if self.m00 != one || self.m11 != one {
            TransformClass::ScaleTranslate
        } else if self.m02 != 0 || self.m12 != 0 {
            TransformClass::Translate
        } else {
            TransformClass::Identity
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
