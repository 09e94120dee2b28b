//! Color types and packed-pixel helpers.
//!
//! Two representations are used throughout the renderer:
//! - [`Rgba8`]: u8 components, the caller-facing (straight alpha) color.
//! - packed `u32` ARGB: premultiplied, `0xAARRGGBB`; every paint generator
//!   emits this form so the compositor never branches on paint internals.

use crate::basics::div255;

// ============================================================================
// Rgba8
// ============================================================================

/// RGBA color with u8 components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rgba8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba8 {
    pub const BASE_SHIFT: u32 = 8;
    pub const BASE_MASK: u32 = (1 << Self::BASE_SHIFT) - 1;
    pub const BASE_MSB: u32 = 1 << (Self::BASE_SHIFT - 1);

    pub const TRANSPARENT: Rgba8 = Rgba8 {
        r: 0,
        g: 0,
        b: 0,
        a: 0,
    };

    pub fn new(r: u32, g: u32, b: u32, a: u32) -> Self {
        Self {
            r: r as u8,
            g: g as u8,
            b: b as u8,
            a: a as u8,
        }
    }

    pub fn new_opaque(r: u32, g: u32, b: u32) -> Self {
        Self::new(r, g, b, Self::BASE_MASK)
    }

    /// Unpack a straight-alpha `0xAARRGGBB` value.
    pub fn from_argb(v: u32) -> Self {
        Self::new((v >> 16) & 0xFF, (v >> 8) & 0xFF, v & 0xFF, v >> 24)
    }

    /// Fixed-point multiply, exact over u8.
    #[inline]
    pub fn multiply(a: u8, b: u8) -> u8 {
        let t: u32 = a as u32 * b as u32 + Self::BASE_MSB;
        (((t >> Self::BASE_SHIFT) + t) >> Self::BASE_SHIFT) as u8
    }

    /// Interpolate p to q by a.
    #[inline]
    pub fn lerp(p: u8, q: u8, a: u8) -> u8 {
        let t = (q as i32 - p as i32) * a as i32 + Self::BASE_MSB as i32 - (p > q) as i32;
        (p as i32 + (((t >> Self::BASE_SHIFT) + t) >> Self::BASE_SHIFT)) as u8
    }

    pub fn premultiply(&mut self) -> &mut Self {
        if self.a != Self::BASE_MASK as u8 {
            if self.a == 0 {
                self.r = 0;
                self.g = 0;
                self.b = 0;
            } else {
                self.r = Self::multiply(self.r, self.a);
                self.g = Self::multiply(self.g, self.a);
                self.b = Self::multiply(self.b, self.a);
            }
        }
        self
    }

    pub fn demultiply(&mut self) -> &mut Self {
        if (self.a as u32) < Self::BASE_MASK {
            if self.a == 0 {
                self.r = 0;
                self.g = 0;
                self.b = 0;
            } else {
                let a = self.a as u32;
                let half = a >> 1;
                self.r = ((self.r as u32 * Self::BASE_MASK + half) / a).min(Self::BASE_MASK) as u8;
                self.g = ((self.g as u32 * Self::BASE_MASK + half) / a).min(Self::BASE_MASK) as u8;
                self.b = ((self.b as u32 * Self::BASE_MASK + half) / a).min(Self::BASE_MASK) as u8;
            }
        }
        self
    }

    /// Interpolate between `self` and `c` by parameter `k` (0.0 to 1.0).
    pub fn gradient(&self, c: &Rgba8, k: f64) -> Rgba8 {
        let ik = (k.clamp(0.0, 1.0) * Self::BASE_MASK as f64 + 0.5) as u8;
        Rgba8 {
            r: Self::lerp(self.r, c.r, ik),
            g: Self::lerp(self.g, c.g, ik),
            b: Self::lerp(self.b, c.b, ik),
            a: Self::lerp(self.a, c.a, ik),
        }
    }

    /// Pack as `0xAARRGGBB` without touching the channels.
    #[inline]
    pub fn to_argb(&self) -> u32 {
        pack_argb(self.a as u32, self.r as u32, self.g as u32, self.b as u32)
    }

    /// Premultiply and pack as `0xAARRGGBB`.
    pub fn to_argb_pre(&self) -> u32 {
        let mut c = *self;
        c.premultiply();
        c.to_argb()
    }
}

// ============================================================================
// Packed premultiplied ARGB helpers
// ============================================================================

#[inline]
pub fn pack_argb(a: u32, r: u32, g: u32, b: u32) -> u32 {
    (a << 24) | (r << 16) | (g << 8) | b
}

#[inline]
pub fn alpha_of(v: u32) -> u32 {
    v >> 24
}

/// Split a packed value into `[a, r, g, b]`.
#[inline]
pub fn unpack_argb(v: u32) -> [u32; 4] {
    [v >> 24, (v >> 16) & 0xFF, (v >> 8) & 0xFF, v & 0xFF]
}

/// Channel-wise product of two premultiplied pixels.
#[inline]
pub fn mul_argb(x: u32, y: u32) -> u32 {
    let [xa, xr, xg, xb] = unpack_argb(x);
    let [ya, yr, yg, yb] = unpack_argb(y);
    pack_argb(div255(xa * ya), div255(xr * yr), div255(xg * yg), div255(xb * yb))
}

// ============================================================================
// Tests
// ============================================================================
