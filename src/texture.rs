//! Texture paint source.
//!
//! A [`TextureSource`] owns texel data (premultiplied ARGB ints, or RGB565
//! words with an optional alpha plane), an inverse transform from device
//! space to texel space in 16.16 fixed point, and the sampling policy:
//! nearest or bilinear, repeat or per-edge [`EdgePolicy`].

use log::debug;
use thiserror::Error;

use crate::basics::{FIXED_ONE, FIXED_SHIFT};
use crate::paint::SpanGenerator;
use crate::surface::decode_565a;
use crate::trans_affine::{FixedAffine, TransAffine, TransformClass};

const HALF: i64 = (FIXED_ONE / 2) as i64;

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TextureError {
    #[error("texture must have a non-zero size, got {width}x{height}")]
    Empty { width: u32, height: u32 },
    #[error("texture stride {stride} is smaller than its width {width}")]
    StrideTooSmall { stride: usize, width: u32 },
    #[error("texture data holds {len} texels but {needed} are needed")]
    BufferTooSmall { len: usize, needed: usize },
    #[error("alpha plane holds {len} bytes but {needed} are needed")]
    AlphaTooSmall { len: usize, needed: usize },
}

// ============================================================================
// Edge policy
// ============================================================================

/// What a non-repeating texture does past one of its edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EdgePolicy {
    /// Texels past the edge are transparent; bilinear samples fade out.
    #[default]
    Keep,
    /// Texels past the edge repeat the edge texel.
    Pad,
    /// Samples whose centre lies past the edge are transparent.
    Trim,
}

/// Edge policy for each of the four texture edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TextureEdges {
    pub left: EdgePolicy,
    pub top: EdgePolicy,
    pub right: EdgePolicy,
    pub bottom: EdgePolicy,
}

impl TextureEdges {
    pub fn uniform(p: EdgePolicy) -> Self {
        Self {
            left: p,
            top: p,
            right: p,
            bottom: p,
        }
    }
}

// ============================================================================
// Texel storage
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
enum TexelData {
    Argb(Vec<u32>),
    Rgb565 { rgb: Vec<u16>, alpha: Option<Vec<u8>> },
}

// ============================================================================
// TextureSource
// ============================================================================

/// Sampled pixel source with its own transform and edge handling.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureSource {
    data: TexelData,
    width: u32,
    height: u32,
    stride: usize,
    has_alpha: bool,
    inverse: Option<FixedAffine>,
    class: TransformClass,
    repeat: bool,
    interpolate: bool,
    edges: TextureEdges,
}

impl TextureSource {
    /// Texture over premultiplied ARGB texels, `stride` texels per row.
    ///
    /// Without `has_alpha` every texel is treated as opaque.
    pub fn from_argb(
        data: Vec<u32>,
        width: u32,
        height: u32,
        stride: usize,
        has_alpha: bool,
    ) -> Result<Self, TextureError> {
        let needed = check_layout(width, height, stride)?;
        if data.len() < needed {
            return Err(TextureError::BufferTooSmall {
                len: data.len(),
                needed,
            });
        }
        Ok(Self::with_data(
            TexelData::Argb(data),
            width,
            height,
            stride,
            has_alpha,
        ))
    }

    /// Texture over RGB565 words plus an optional alpha plane with the same
    /// layout. With an alpha plane the color words are premultiplied.
    pub fn from_rgb565(
        rgb: Vec<u16>,
        alpha: Option<Vec<u8>>,
        width: u32,
        height: u32,
        stride: usize,
    ) -> Result<Self, TextureError> {
        let needed = check_layout(width, height, stride)?;
        if rgb.len() < needed {
            return Err(TextureError::BufferTooSmall {
                len: rgb.len(),
                needed,
            });
        }
        if let Some(a) = &alpha {
            if a.len() < needed {
                return Err(TextureError::AlphaTooSmall {
                    len: a.len(),
                    needed,
                });
            }
        }
        let has_alpha = alpha.is_some();
        Ok(Self::with_data(
            TexelData::Rgb565 { rgb, alpha },
            width,
            height,
            stride,
            has_alpha,
        ))
    }

    fn with_data(data: TexelData, width: u32, height: u32, stride: usize, has_alpha: bool) -> Self {
        Self {
            data,
            width,
            height,
            stride,
            has_alpha,
            inverse: Some(FixedAffine::IDENTITY),
            class: TransformClass::Identity,
            repeat: false,
            interpolate: false,
            edges: TextureEdges::default(),
        }
    }

    /// Set the texture-to-device transform.
    ///
    /// A singular transform leaves the texture fully transparent.
    pub fn set_transform(&mut self, m: &TransAffine) -> &mut Self {
        match m.inverted() {
            Some(inv) => {
                let fixed = FixedAffine::from_affine(&inv);
                self.class = fixed.classify();
                self.inverse = Some(fixed);
            }
            None => {
                debug!("singular texture transform {m:?}; texture paints nothing");
                self.inverse = None;
                self.class = TransformClass::Generic;
            }
        }
        self
    }

    pub fn set_repeat(&mut self, repeat: bool) -> &mut Self {
        self.repeat = repeat;
        self
    }

    pub fn set_interpolate(&mut self, interpolate: bool) -> &mut Self {
        self.interpolate = interpolate;
        self
    }

    pub fn set_edges(&mut self, edges: TextureEdges) -> &mut Self {
        self.edges = edges;
        self
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn has_alpha(&self) -> bool {
        self.has_alpha
    }

    pub fn repeat(&self) -> bool {
        self.repeat
    }

    pub fn interpolate(&self) -> bool {
        self.interpolate
    }

    pub fn edges(&self) -> TextureEdges {
        self.edges
    }

    pub fn transform_class(&self) -> TransformClass {
        self.class
    }

    /// Premultiplied texel at a stored index.
    #[inline]
    fn fetch(&self, idx: usize) -> u32 {
        match &self.data {
            TexelData::Argb(d) => {
                let v = d.get(idx).copied().unwrap_or(0);
                if self.has_alpha {
                    v
                } else {
                    v | 0xFF00_0000
                }
            }
            TexelData::Rgb565 { rgb, alpha } => {
                let w = rgb.get(idx).copied().unwrap_or(0);
                let a = match alpha {
                    Some(a) => a.get(idx).copied().unwrap_or(0),
                    None => 0xFF,
                };
                decode_565a(w as u8, (w >> 8) as u8, a)
            }
        }
    }

    #[inline]
    fn resolve(v: i64, size: u32, repeat: bool, edges: (EdgePolicy, EdgePolicy)) -> Option<usize> {
        let (low, high) = edges;
        let size = size as i64;
        if repeat {
            return Some(v.rem_euclid(size) as usize);
        }
        if v < 0 {
            (low == EdgePolicy::Pad).then_some(0)
        } else if v >= size {
            (high == EdgePolicy::Pad).then_some(size as usize - 1)
        } else {
            Some(v as usize)
        }
    }

    #[inline]
    fn column(&self, tx: i64) -> Option<usize> {
        Self::resolve(tx, self.width, self.repeat, (self.edges.left, self.edges.right))
    }

    #[inline]
    fn row(&self, ty: i64) -> Option<usize> {
        Self::resolve(ty, self.height, self.repeat, (self.edges.top, self.edges.bottom))
    }

    #[inline]
    fn texel(&self, col: Option<usize>, row: Option<usize>) -> u32 {
        match (col, row) {
            (Some(c), Some(r)) => self.fetch(r * self.stride + c),
            _ => 0,
        }
    }

    #[inline]
    fn trimmed_u(&self, u: i64) -> bool {
        let past_right = u >= (self.width as i64) << FIXED_SHIFT;
        !self.repeat
            && ((u < 0 && self.edges.left == EdgePolicy::Trim)
                || (past_right && self.edges.right == EdgePolicy::Trim))
    }

    #[inline]
    fn trimmed_v(&self, v: i64) -> bool {
        let past_bottom = v >= (self.height as i64) << FIXED_SHIFT;
        !self.repeat
            && ((v < 0 && self.edges.top == EdgePolicy::Trim)
                || (past_bottom && self.edges.bottom == EdgePolicy::Trim))
    }

    fn sample_nearest(&self, u: i64, v: i64) -> u32 {
        if self.trimmed_u(u) || self.trimmed_v(v) {
            return 0;
        }
        self.texel(self.column(u >> FIXED_SHIFT), self.row(v >> FIXED_SHIFT))
    }

    fn sample_bilinear(&self, u: i64, v: i64) -> u32 {
        if self.trimmed_u(u) || self.trimmed_v(v) {
            return 0;
        }
        let u = u - HALF;
        let v = v - HALF;
        let (x0, y0) = (u >> FIXED_SHIFT, v >> FIXED_SHIFT);
        let fx = ((u >> 8) & 0xFF) as u32;
        let fy = ((v >> 8) & 0xFF) as u32;
        let (c0, c1) = (self.column(x0), self.column(x0 + 1));
        let (r0, r1) = (self.row(y0), self.row(y0 + 1));
        let top = lerp_argb(self.texel(c0, r0), self.texel(c1, r0), fx);
        let bottom = lerp_argb(self.texel(c0, r1), self.texel(c1, r1), fx);
        lerp_argb(top, bottom, fy)
    }

    /// Texel-space position of the centre of device pixel (x, y), 16.16.
    #[inline]
    fn map(m: &FixedAffine, x: i32, y: i32) -> (i64, i64) {
        let px = ((x as i64) << FIXED_SHIFT) + HALF;
        let py = ((y as i64) << FIXED_SHIFT) + HALF;
        let dot = |a: i64, b: i64, c: i64| {
            let s = (a as i128 * px as i128 + b as i128 * py as i128) >> FIXED_SHIFT;
            (s as i64).saturating_add(c)
        };
        (dot(m.m00, m.m01, m.m02), dot(m.m10, m.m11, m.m12))
    }
}

impl SpanGenerator for TextureSource {
    fn generate(&self, span: &mut [u32], x: i32, y: i32) {
        let Some(m) = self.inverse else {
            span.fill(0);
            return;
        };
        let (mut u, mut v) = Self::map(&m, x, y);

        match (self.class, self.interpolate) {
            (TransformClass::Generic, _) | (_, true) => {
                for px in span.iter_mut() {
                    *px = if self.interpolate {
                        self.sample_bilinear(u, v)
                    } else {
                        self.sample_nearest(u, v)
                    };
                    u = u.saturating_add(m.m00);
                    v = v.saturating_add(m.m10);
                }
            }
            // Axis-aligned nearest sampling: the texel row is constant.
            _ => {
                let row = if self.trimmed_v(v) {
                    None
                } else {
                    self.row(v >> FIXED_SHIFT)
                };
                for px in span.iter_mut() {
                    *px = if self.trimmed_u(u) {
                        0
                    } else {
                        self.texel(self.column(u >> FIXED_SHIFT), row)
                    };
                    u = u.saturating_add(m.m00);
                }
            }
        }
    }
}

fn check_layout(width: u32, height: u32, stride: usize) -> Result<usize, TextureError> {
    if width == 0 || height == 0 {
        return Err(TextureError::Empty { width, height });
    }
    if stride < width as usize {
        return Err(TextureError::StrideTooSmall { stride, width });
    }
    Ok((height as usize - 1) * stride + width as usize)
}

/// Channel-wise `p + (q - p) * f / 256` for `f` in `0..256`.
#[inline]
fn lerp_argb(p: u32, q: u32, f: u32) -> u32 {
    if f == 0 || p == q {
        return p;
    }
    let g = 256 - f;
    let rb = (((p & 0x00FF_00FF) * g + (q & 0x00FF_00FF) * f) >> 8) & 0x00FF_00FF;
    let ag = ((((p >> 8) & 0x00FF_00FF) * g + ((q >> 8) & 0x00FF_00FF) * f) >> 8) & 0x00FF_00FF;
    (ag << 8) | rb
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const WHITE: u32 = 0xFFFF_FFFF;

    fn checker() -> TextureSource {
        // 2x2: red, green / blue, white
        TextureSource::from_argb(
            vec![0xFFFF_0000, 0xFF00_FF00, 0xFF00_00FF, WHITE],
            2,
            2,
            2,
            true,
        )
        .unwrap()
    }

    fn white_bar(edges: EdgePolicy, interpolate: bool) -> TextureSource {
        let mut t = TextureSource::from_argb(vec![WHITE; 2], 2, 1, 2, true).unwrap();
        t.set_edges(TextureEdges::uniform(edges))
            .set_interpolate(interpolate);
        t
    }

    #[test]
    fn test_layout_errors() {
        assert_eq!(
            TextureSource::from_argb(vec![], 0, 4, 4, true),
            Err(TextureError::Empty {
                width: 0,
                height: 4
            })
        );
        assert_eq!(
            TextureSource::from_argb(vec![0; 16], 4, 4, 3, true),
            Err(TextureError::StrideTooSmall { stride: 3, width: 4 })
        );
        assert_eq!(
            TextureSource::from_argb(vec![0; 10], 4, 4, 4, true),
            Err(TextureError::BufferTooSmall { len: 10, needed: 16 })
        );
        assert_eq!(
            TextureSource::from_rgb565(vec![0; 4], Some(vec![0; 3]), 2, 2, 2),
            Err(TextureError::AlphaTooSmall { len: 3, needed: 4 })
        );
    }

    #[test]
    fn test_identity_nearest_copies_texels() {
        let t = checker();
        let mut span = [0u32; 2];
        t.generate(&mut span, 0, 0);
        assert_eq!(span, [0xFFFF_0000, 0xFF00_FF00]);
        t.generate(&mut span, 0, 1);
        assert_eq!(span, [0xFF00_00FF, WHITE]);
    }

    #[test]
    fn test_translate_and_scale() {
        let mut t = checker();
        t.set_transform(&TransAffine::new_translation(10.0, 5.0));
        assert_eq!(t.transform_class(), TransformClass::Translate);
        let mut span = [0u32; 2];
        t.generate(&mut span, 10, 6);
        assert_eq!(span, [0xFF00_00FF, WHITE]);

        t.set_transform(&TransAffine::new_scaling(2.0, 2.0));
        assert_eq!(t.transform_class(), TransformClass::ScaleTranslate);
        let mut span = [0u32; 4];
        t.generate(&mut span, 0, 0);
        assert_eq!(span, [0xFFFF_0000, 0xFFFF_0000, 0xFF00_FF00, 0xFF00_FF00]);
    }

    #[test]
    fn test_rotated_matches_axis_aligned_path() {
        // A quarter turn maps texel columns to device rows.
        let mut t = checker();
        let mut m = TransAffine::new_rotation(std::f64::consts::FRAC_PI_2);
        m.multiply(&TransAffine::new_translation(2.0, 0.0));
        t.set_transform(&m);
        assert_eq!(t.transform_class(), TransformClass::Generic);
        let mut span = [0u32; 2];
        t.generate(&mut span, 0, 0);
        assert_eq!(span, [0xFF00_00FF, 0xFFFF_0000]);
    }

    #[test]
    fn test_repeat_wraps() {
        let mut t = checker();
        t.set_repeat(true);
        let mut span = [0u32; 5];
        t.generate(&mut span, -2, 0);
        assert_eq!(
            span,
            [0xFFFF_0000, 0xFF00_FF00, 0xFFFF_0000, 0xFF00_FF00, 0xFFFF_0000]
        );
    }

    #[test]
    fn test_nearest_edge_policies() {
        let mut span = [0u32; 4];
        white_bar(EdgePolicy::Keep, false).generate(&mut span, -1, 0);
        assert_eq!(span, [0, WHITE, WHITE, 0]);
        white_bar(EdgePolicy::Pad, false).generate(&mut span, -1, 0);
        assert_eq!(span, [WHITE; 4]);
        white_bar(EdgePolicy::Trim, false).generate(&mut span, -1, 0);
        assert_eq!(span, [0, WHITE, WHITE, 0]);
    }

    #[test]
    fn test_bilinear_edge_policies() {
        // Shift by half a texel so device pixel 2 samples the right edge.
        let shift = TransAffine::new_translation(0.5, 0.0);
        let mut span = [0u32; 1];

        let mut keep = white_bar(EdgePolicy::Keep, true);
        keep.set_transform(&shift);
        keep.generate(&mut span, 2, 0);
        assert_eq!(span[0] >> 24, 127);

        let mut pad = white_bar(EdgePolicy::Pad, true);
        pad.set_transform(&shift);
        pad.generate(&mut span, 2, 0);
        assert_eq!(span[0], WHITE);

        let mut trim = white_bar(EdgePolicy::Trim, true);
        trim.set_transform(&shift);
        trim.generate(&mut span, 2, 0);
        assert_eq!(span[0], 0);
    }

    #[test]
    fn test_bilinear_at_texel_centres_is_exact() {
        let mut t = checker();
        t.set_interpolate(true);
        let mut span = [0u32; 2];
        t.generate(&mut span, 0, 1);
        assert_eq!(span, [0xFF00_00FF, WHITE]);
    }

    #[test]
    fn test_bilinear_midpoint_averages() {
        let mut t = TextureSource::from_argb(vec![0xFF00_0000, WHITE], 2, 1, 2, true).unwrap();
        t.set_interpolate(true)
            .set_edges(TextureEdges::uniform(EdgePolicy::Pad))
            .set_transform(&TransAffine::new_translation(0.5, 0.0));
        let mut span = [0u32; 1];
        t.generate(&mut span, 1, 0);
        assert_eq!(span[0], 0xFF7F_7F7F);
    }

    #[test]
    fn test_opaque_texture_forces_alpha() {
        let t = TextureSource::from_argb(vec![0x0012_3456], 1, 1, 1, false).unwrap();
        let mut span = [0u32; 1];
        t.generate(&mut span, 0, 0);
        assert_eq!(span[0], 0xFF12_3456);
    }

    #[test]
    fn test_rgb565_texture() {
        let t = TextureSource::from_rgb565(vec![0xF800, 0x07E0], None, 2, 1, 2).unwrap();
        let mut span = [0u32; 2];
        t.generate(&mut span, 0, 0);
        assert_eq!(span, [0xFFFF_0000, 0xFF00_FF00]);
    }

    #[test]
    fn test_singular_transform_is_transparent() {
        let mut t = checker();
        t.set_transform(&TransAffine::new_scaling(0.0, 0.0));
        let mut span = [1u32; 3];
        t.generate(&mut span, 0, 0);
        assert_eq!(span, [0; 3]);
    }
}
