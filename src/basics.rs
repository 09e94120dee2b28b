//! Foundation types, constants, and fixed-point helpers.
//!
//! Everything else in the crate depends on these: coverage constants, the
//! 16.16 fixed-point scale, the fill rule, and the inclusive integer
//! rectangle used for clip and touched bounds.

// ============================================================================
// Rounding and conversion functions
// ============================================================================

/// Floor a double to the nearest integer toward negative infinity.
#[inline]
pub fn ifloor(v: f64) -> i32 {
    let i = v as i32;
    i - (i as f64 > v) as i32
}

// ============================================================================
// Cover (anti-aliasing) constants
// ============================================================================

/// The type used for anti-aliasing coverage values.
pub type CoverType = u8;

pub const COVER_NONE: CoverType = 0;
pub const COVER_FULL: CoverType = 255;

/// Exact `x / 255` with rounding for `x` in `0..=255*255`.
#[inline]
pub fn div255(x: u32) -> u32 {
    (x * 257 + 257) >> 16
}

// ============================================================================
// 16.16 fixed point
// ============================================================================

pub const FIXED_SHIFT: u32 = 16;
pub const FIXED_ONE: i32 = 1 << FIXED_SHIFT;
pub const FIXED_MASK: i32 = FIXED_ONE - 1;

/// Convert to 16.16 fixed point in 64 bits (for coordinates that may exceed 32K).
#[inline]
pub fn to_fixed64(v: f64) -> i64 {
    let f = (v * FIXED_ONE as f64).round();
    if f.is_nan() {
        0
    } else {
        f.clamp(i64::MIN as f64 / 2.0, i64::MAX as f64 / 2.0) as i64
    }
}

// ============================================================================
// Fill rule
// ============================================================================

/// Winding rule used to decide which spans of a scanline are inside.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FillRule {
    /// Inside while the signed winding count is non-zero.
    #[default]
    NonZero,
    /// Inside after an odd number of crossings, regardless of direction.
    EvenOdd,
}

impl FillRule {
    /// Whether a running winding count is inside under this rule.
    #[inline]
    pub fn is_inside(self, winding: i32) -> bool {
        match self {
            FillRule::NonZero => winding != 0,
            FillRule::EvenOdd => winding & 1 != 0,
        }
    }
}

// ============================================================================
// Rectangle
// ============================================================================

/// Axis-aligned rectangle with inclusive corners `(x1, y1)`..`(x2, y2)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect<T: Copy> {
    pub x1: T,
    pub y1: T,
    pub x2: T,
    pub y2: T,
}

impl<T: Copy + PartialOrd> Rect<T> {
    pub fn new(x1: T, y1: T, x2: T, y2: T) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Clip this rectangle to the intersection with `r`.
    /// Returns `true` if the result is a valid (non-empty) rectangle.
    pub fn clip(&mut self, r: &Self) -> bool {
        if self.x2 > r.x2 {
            self.x2 = r.x2;
        }
        if self.y2 > r.y2 {
            self.y2 = r.y2;
        }
        if self.x1 < r.x1 {
            self.x1 = r.x1;
        }
        if self.y1 < r.y1 {
            self.y1 = r.y1;
        }
        self.is_valid()
    }

    /// Returns `true` if the rectangle is non-empty.
    pub fn is_valid(&self) -> bool {
        self.x1 <= self.x2 && self.y1 <= self.y2
    }

    /// Grow the rectangle to include the horizontal run `x1..=x2` on row `y`.
    pub fn add_hspan(&mut self, x1: T, x2: T, y: T) {
        if x1 < self.x1 {
            self.x1 = x1;
        }
        if x2 > self.x2 {
            self.x2 = x2;
        }
        if y < self.y1 {
            self.y1 = y;
        }
        if y > self.y2 {
            self.y2 = y;
        }
    }
}

pub type RectI = Rect<i32>;

impl RectI {
    /// The canonical empty rectangle (`x1 > x2`).
    pub const EMPTY: RectI = RectI {
        x1: 1,
        y1: 1,
        x2: 0,
        y2: 0,
    };

    pub fn width(&self) -> i32 {
        self.x2 - self.x1 + 1
    }

    pub fn height(&self) -> i32 {
        self.y2 - self.y1 + 1
    }
}

// ============================================================================
// Tests
// ============================================================================
