//! Gradient color maps and the linear/radial gradient span generators.
//!
//! A [`GradientColorMap`] turns a list of color stops into a 256-entry table
//! of premultiplied colors plus a [`CycleMethod`]. The generators evaluate a
//! gradient parameter per pixel, fold it in 16.16 fixed point according to
//! the cycle method, and look the color up with `index = folded >> 8`, so
//! every finite or infinite parameter lands in `0..=255`.

use log::debug;

use crate::basics::{to_fixed64, FIXED_MASK};
use crate::color::Rgba8;
use crate::paint::SpanGenerator;
use crate::trans_affine::TransAffine;

pub const GRADIENT_LUT_SIZE: usize = 256;

/// Fraction of the radius a focus point may reach before it is pulled in.
pub const MAX_FOCUS_RATIO: f64 = 0.99;

// ============================================================================
// Stops and cycle methods
// ============================================================================

/// A color stop; `offset` is clamped to `[0, 1]` when the map is built.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradientStop {
    pub offset: f64,
    pub color: Rgba8,
}

impl GradientStop {
    pub fn new(offset: f64, color: Rgba8) -> Self {
        Self { offset, color }
    }
}

/// How a gradient parameter outside `[0, 1]` is folded back in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CycleMethod {
    /// Clamp to the end colors.
    #[default]
    NoCycle,
    /// `g mod 1`.
    Repeat,
    /// Triangle wave: 0→1→0→1…
    Reflect,
}

impl CycleMethod {
    /// Fold a 16.16 parameter into `0..=0xFFFF`.
    #[inline]
    pub fn fold(self, g: i64) -> u32 {
        let one = FIXED_MASK as i64;
        match self {
            CycleMethod::NoCycle => g.clamp(0, one) as u32,
            CycleMethod::Repeat => (g & one) as u32,
            CycleMethod::Reflect => {
                let g = g.unsigned_abs() & 0x1FFFF;
                if g > 0xFFFF {
                    (0x20000 - g).min(0xFFFF) as u32
                } else {
                    g as u32
                }
            }
        }
    }
}

// ============================================================================
// GradientColorMap
// ============================================================================

/// Precomputed 256-entry premultiplied color table with a cycle method.
#[derive(Debug, Clone, PartialEq)]
pub struct GradientColorMap {
    lut: [u32; GRADIENT_LUT_SIZE],
    cycle: CycleMethod,
}

impl GradientColorMap {
    /// Build the table from stops in any order.
    ///
    /// Entries before the first stop take its color, entries after the last
    /// stop take the last color. An empty stop list yields a transparent map.
    pub fn new(stops: &[GradientStop], cycle: CycleMethod) -> Self {
        let mut profile: Vec<GradientStop> = stops
            .iter()
            .filter(|s| !s.offset.is_nan())
            .map(|s| GradientStop::new(s.offset.clamp(0.0, 1.0), s.color))
            .collect();
        profile.sort_by(|a, b| a.offset.total_cmp(&b.offset));

        let mut lut = [0u32; GRADIENT_LUT_SIZE];
        if let (Some(first), Some(last)) = (profile.first(), profile.last()) {
            let mut seg = 0;
            for (i, entry) in lut.iter_mut().enumerate() {
                let t = i as f64 / (GRADIENT_LUT_SIZE - 1) as f64;
                let c = if t <= first.offset {
                    first.color
                } else if t >= last.offset {
                    last.color
                } else {
                    while seg + 1 < profile.len() - 1 && t > profile[seg + 1].offset {
                        seg += 1;
                    }
                    let (s0, s1) = (&profile[seg], &profile[seg + 1]);
                    let span = s1.offset - s0.offset;
                    if span <= 0.0 {
                        s1.color
                    } else {
                        s0.color.gradient(&s1.color, (t - s0.offset) / span)
                    }
                };
                *entry = c.to_argb_pre();
            }
        }
        Self { lut, cycle }
    }

    /// Two-stop convenience constructor.
    pub fn two_color(c0: Rgba8, c1: Rgba8, cycle: CycleMethod) -> Self {
        Self::new(
            &[GradientStop::new(0.0, c0), GradientStop::new(1.0, c1)],
            cycle,
        )
    }

    pub fn cycle(&self) -> CycleMethod {
        self.cycle
    }

    /// Table entry `i` (premultiplied ARGB).
    pub fn entry(&self, i: usize) -> u32 {
        self.lut[i.min(GRADIENT_LUT_SIZE - 1)]
    }

    /// The color at parameter 1.0.
    pub fn end_color(&self) -> u32 {
        self.lut[GRADIENT_LUT_SIZE - 1]
    }

    /// LUT index for a 16.16 fixed-point parameter; always in `0..=255`.
    #[inline]
    pub fn index_fixed(&self, g: i64) -> usize {
        (self.cycle.fold(g) >> 8) as usize
    }

    /// LUT index for a floating-point parameter; always in `0..=255`.
    #[inline]
    pub fn index_for(&self, g: f64) -> usize {
        self.index_fixed(to_fixed64(g))
    }

    #[inline]
    pub fn color_at(&self, g: f64) -> u32 {
        self.lut[self.index_for(g)]
    }
}

// ============================================================================
// Linear gradient
// ============================================================================

/// Linear gradient evaluated as `g(x, y) = x*mx + y*my + b` at pixel centers.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearGradient {
    mx: f64,
    my: f64,
    b: f64,
    degenerate: bool,
    map: GradientColorMap,
}

impl LinearGradient {
    /// Gradient from `(x0, y0)` (parameter 0) to `(x1, y1)` (parameter 1),
    /// both given in gradient space; `transform` maps gradient space to
    /// device space.
    ///
    /// A zero-length vector or singular transform yields a gradient that
    /// paints the end color everywhere.
    pub fn new(
        x0: f64,
        y0: f64,
        x1: f64,
        y1: f64,
        transform: &TransAffine,
        map: GradientColorMap,
    ) -> Self {
        let dx = x1 - x0;
        let dy = y1 - y0;
        let dss = dx * dx + dy * dy;
        let inv = transform.inverted();
        match inv {
            Some(inv) if dss > 0.0 && dss.is_finite() => {
                let mx = (dx * inv.sx + dy * inv.shy) / dss;
                let my = (dx * inv.shx + dy * inv.sy) / dss;
                let b = (dx * (inv.tx - x0) + dy * (inv.ty - y0)) / dss;
                Self {
                    mx,
                    my,
                    b,
                    degenerate: false,
                    map,
                }
            }
            _ => {
                debug!("degenerate linear gradient ({x0},{y0})-({x1},{y1}); using end color");
                Self {
                    mx: 0.0,
                    my: 0.0,
                    b: 1.0,
                    degenerate: true,
                    map,
                }
            }
        }
    }

    pub fn is_degenerate(&self) -> bool {
        self.degenerate
    }

    pub fn color_map(&self) -> &GradientColorMap {
        &self.map
    }

    /// Gradient parameter at the center of pixel (x, y).
    pub fn parameter(&self, x: i32, y: i32) -> f64 {
        if self.degenerate {
            return 1.0;
        }
        (x as f64 + 0.5) * self.mx + (y as f64 + 0.5) * self.my + self.b
    }
}

impl SpanGenerator for LinearGradient {
    fn generate(&self, span: &mut [u32], x: i32, y: i32) {
        if self.degenerate {
            span.fill(self.map.end_color());
            return;
        }
        let g0 = self.parameter(x, y);
        for (i, px) in span.iter_mut().enumerate() {
            let g = g0 + i as f64 * self.mx;
            *px = self.map.color_at(g);
        }
    }
}

// ============================================================================
// Radial gradient
// ============================================================================

/// Two-point radial gradient: parameter 0 at the focus, 1 on the circle.
///
/// Pixel centers are mapped into gradient space relative to the circle
/// center with the inverse transform `(a00, a01, a02; a10, a11, a12)`.
/// Along a row `dx` advances by `a00` and `dy` by `a10`, so the squared
/// distance and the focus cross term are stepped with forward differences
/// built from `a00²` and `a10²`.
#[derive(Debug, Clone, PartialEq)]
pub struct RadialGradient {
    a00: f64,
    a01: f64,
    a02: f64,
    a10: f64,
    a11: f64,
    a12: f64,
    a00a00: f64,
    a10a10: f64,
    fx: f64,
    fy: f64,
    r2: f64,
    inv_denom: f64,
    degenerate: bool,
    map: GradientColorMap,
}

impl RadialGradient {
    /// Circle at `(cx, cy)` with `radius`, focus at `(fx, fy)`; all in
    /// gradient space, mapped to device space by `transform`.
    ///
    /// A focus on or outside the circle is moved toward the center to
    /// [`MAX_FOCUS_RATIO`] of the radius. Non-positive radii or singular
    /// transforms paint the end color.
    pub fn new(
        cx: f64,
        cy: f64,
        fx: f64,
        fy: f64,
        radius: f64,
        transform: &TransAffine,
        map: GradientColorMap,
    ) -> Self {
        let inv = transform.inverted();
        let valid = radius > 0.0 && radius.is_finite() && fx.is_finite() && fy.is_finite();
        let inv = match inv {
            Some(inv) if valid => inv,
            _ => {
                debug!("degenerate radial gradient (radius {radius}); using end color");
                return Self {
                    a00: 0.0,
                    a01: 0.0,
                    a02: 0.0,
                    a10: 0.0,
                    a11: 0.0,
                    a12: 0.0,
                    a00a00: 0.0,
                    a10a10: 0.0,
                    fx: 0.0,
                    fy: 0.0,
                    r2: 0.0,
                    inv_denom: 0.0,
                    degenerate: true,
                    map,
                };
            }
        };

        let mut fx = fx - cx;
        let mut fy = fy - cy;
        let fd = (fx * fx + fy * fy).sqrt();
        let max_fd = radius * MAX_FOCUS_RATIO;
        if fd > max_fd {
            let k = max_fd / fd;
            fx *= k;
            fy *= k;
        }

        let r2 = radius * radius;
        let (a00, a01, a02) = (inv.sx, inv.shx, inv.tx - cx);
        let (a10, a11, a12) = (inv.shy, inv.sy, inv.ty - cy);
        Self {
            a00,
            a01,
            a02,
            a10,
            a11,
            a12,
            a00a00: a00 * a00,
            a10a10: a10 * a10,
            fx,
            fy,
            r2,
            inv_denom: 1.0 / (r2 - (fx * fx + fy * fy)),
            degenerate: false,
            map,
        }
    }

    pub fn is_degenerate(&self) -> bool {
        self.degenerate
    }

    pub fn color_map(&self) -> &GradientColorMap {
        &self.map
    }

    /// Gradient parameter for an offset `(dx, dy)` from the focus, given the
    /// squared length and the cross term `dx*fy - dy*fx`.
    #[inline]
    fn solve(&self, dx: f64, dy: f64, dist2: f64, cross: f64) -> f64 {
        let disc = self.r2 * dist2 - cross * cross;
        (dx * self.fx + dy * self.fy + disc.abs().sqrt()) * self.inv_denom
    }

    /// Gradient parameter at the center of pixel (x, y).
    pub fn parameter(&self, x: i32, y: i32) -> f64 {
        if self.degenerate {
            return 1.0;
        }
        let px = x as f64 + 0.5;
        let py = y as f64 + 0.5;
        let dx = self.a00 * px + self.a01 * py + self.a02 - self.fx;
        let dy = self.a10 * px + self.a11 * py + self.a12 - self.fy;
        self.solve(dx, dy, dx * dx + dy * dy, dx * self.fy - dy * self.fx)
    }
}

impl SpanGenerator for RadialGradient {
    fn generate(&self, span: &mut [u32], x: i32, y: i32) {
        if self.degenerate {
            span.fill(self.map.end_color());
            return;
        }
        let px = x as f64 + 0.5;
        let py = y as f64 + 0.5;
        let mut dx = self.a00 * px + self.a01 * py + self.a02 - self.fx;
        let mut dy = self.a10 * px + self.a11 * py + self.a12 - self.fy;

        let step2 = self.a00a00 + self.a10a10;
        let mut dist2 = dx * dx + dy * dy;
        let mut d_dist2 = 2.0 * (dx * self.a00 + dy * self.a10) + step2;
        let mut cross = dx * self.fy - dy * self.fx;
        let d_cross = self.a00 * self.fy - self.a10 * self.fx;

        for px in span.iter_mut() {
            *px = self.map.color_at(self.solve(dx, dy, dist2, cross));
            dx += self.a00;
            dy += self.a10;
            dist2 += d_dist2;
            d_dist2 += 2.0 * step2;
            cross += d_cross;
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
