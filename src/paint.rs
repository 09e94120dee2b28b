//! Paint generation.
//!
//! Every paint mode produces premultiplied `0xAARRGGBB` colors into a span
//! buffer through [`SpanGenerator`], so the compositor sees one packing no
//! matter where the colors came from. The renderer's paint configuration is
//! split into [`PaintState`] (mode and flat color), [`GradientState`] and
//! [`TextureState`]; [`PaintSource`] borrows the active one for a row.

use log::debug;

use crate::color::{mul_argb, Rgba8};
use crate::gradient::{LinearGradient, RadialGradient};
use crate::texture::TextureSource;

// ============================================================================
// SpanGenerator
// ============================================================================

/// Produces a run of premultiplied ARGB colors for pixels `x..x+span.len()`
/// on row `y`.
pub trait SpanGenerator {
    fn generate(&self, span: &mut [u32], x: i32, y: i32);
}

// ============================================================================
// Paint modes
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PaintMode {
    #[default]
    Flat,
    LinearGradient,
    RadialGradient,
    Texture,
    /// Texture tinted by the flat color (channel-wise product).
    TextureMultiply,
}

/// Whether a paint needs a per-pixel source buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaintKind {
    Flat,
    Generated,
}

impl PaintMode {
    pub fn kind(self) -> PaintKind {
        match self {
            PaintMode::Flat => PaintKind::Flat,
            _ => PaintKind::Generated,
        }
    }
}

// ============================================================================
// State
// ============================================================================

/// Active paint mode and flat color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PaintState {
    pub mode: PaintMode,
    color: Rgba8,
    color_pre: u32,
}

impl PaintState {
    pub fn set_color(&mut self, c: Rgba8) {
        self.color = c;
        self.color_pre = c.to_argb_pre();
    }

    /// The flat color as given (straight alpha).
    pub fn color(&self) -> Rgba8 {
        self.color
    }

    /// The flat color, premultiplied.
    pub fn color_pre(&self) -> u32 {
        self.color_pre
    }

    /// The mode actually painted: a gradient or texture mode without its
    /// source paints the flat color instead.
    pub fn effective_mode(&self, gradients: &GradientState, textures: &TextureState) -> PaintMode {
        let available = match self.mode {
            PaintMode::Flat => true,
            PaintMode::LinearGradient => gradients.linear.is_some(),
            PaintMode::RadialGradient => gradients.radial.is_some(),
            PaintMode::Texture | PaintMode::TextureMultiply => textures.texture.is_some(),
        };
        if available {
            self.mode
        } else {
            debug!("{:?} paint has no source configured; painting flat color", self.mode);
            PaintMode::Flat
        }
    }
}

/// Gradients built by the last gradient setters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GradientState {
    pub linear: Option<LinearGradient>,
    pub radial: Option<RadialGradient>,
}

/// Bound texture.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextureState {
    pub texture: Option<TextureSource>,
}

// ============================================================================
// PaintSource
// ============================================================================

/// The paint for one row, borrowed from the renderer state.
#[derive(Debug, Clone, Copy)]
pub enum PaintSource<'p> {
    Flat(u32),
    Linear(&'p LinearGradient),
    Radial(&'p RadialGradient),
    Texture(&'p TextureSource),
    TextureMultiply(&'p TextureSource, u32),
}

impl<'p> PaintSource<'p> {
    /// Borrow the source for `mode`, normally a result of
    /// [`PaintState::effective_mode`]. Missing sources paint the flat color.
    pub fn new(
        mode: PaintMode,
        paint: &PaintState,
        gradients: &'p GradientState,
        textures: &'p TextureState,
    ) -> Self {
        let flat = PaintSource::Flat(paint.color_pre());
        match mode {
            PaintMode::Flat => flat,
            PaintMode::LinearGradient => {
                gradients.linear.as_ref().map_or(flat, PaintSource::Linear)
            }
            PaintMode::RadialGradient => {
                gradients.radial.as_ref().map_or(flat, PaintSource::Radial)
            }
            PaintMode::Texture => textures.texture.as_ref().map_or(flat, PaintSource::Texture),
            PaintMode::TextureMultiply => textures
                .texture
                .as_ref()
                .map_or(flat, |t| PaintSource::TextureMultiply(t, paint.color_pre())),
        }
    }

    pub fn kind(&self) -> PaintKind {
        match self {
            PaintSource::Flat(_) => PaintKind::Flat,
            _ => PaintKind::Generated,
        }
    }

    /// The constant color of a flat paint.
    pub fn flat_color(&self) -> Option<u32> {
        match self {
            PaintSource::Flat(c) => Some(*c),
            _ => None,
        }
    }
}

impl SpanGenerator for PaintSource<'_> {
    fn generate(&self, span: &mut [u32], x: i32, y: i32) {
        match self {
            PaintSource::Flat(c) => span.fill(*c),
            PaintSource::Linear(g) => g.generate(span, x, y),
            PaintSource::Radial(g) => g.generate(span, x, y),
            PaintSource::Texture(t) => t.generate(span, x, y),
            PaintSource::TextureMultiply(t, tint) => {
                t.generate(span, x, y);
                for px in span.iter_mut() {
                    *px = mul_argb(*px, *tint);
                }
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gradient::{CycleMethod, GradientColorMap};
    use crate::trans_affine::TransAffine;

    fn texture() -> TextureSource {
        TextureSource::from_argb(vec![0xFFFF_FFFF, 0x8080_8080], 2, 1, 2, true).unwrap()
    }

    #[test]
    fn test_paint_kind() {
        assert_eq!(PaintMode::Flat.kind(), PaintKind::Flat);
        assert_eq!(PaintMode::RadialGradient.kind(), PaintKind::Generated);
        assert_eq!(PaintMode::TextureMultiply.kind(), PaintKind::Generated);
    }

    #[test]
    fn test_color_is_stored_premultiplied() {
        let mut p = PaintState::default();
        p.set_color(Rgba8::new(255, 0, 0, 128));
        assert_eq!(p.color_pre(), 0x8080_0000);
        assert_eq!(p.color(), Rgba8::new(255, 0, 0, 128));
    }

    #[test]
    fn test_flat_source_fills_span() {
        let mut p = PaintState::default();
        p.set_color(Rgba8::new_opaque(0, 0, 255));
        let (g, t) = (GradientState::default(), TextureState::default());
        let src = PaintSource::new(PaintMode::Flat, &p, &g, &t);
        assert_eq!(src.flat_color(), Some(0xFF00_00FF));
        let mut span = [0u32; 3];
        src.generate(&mut span, 7, 7);
        assert_eq!(span, [0xFF00_00FF; 3]);
    }

    #[test]
    fn test_missing_source_falls_back_to_flat() {
        let p = PaintState {
            mode: PaintMode::LinearGradient,
            ..PaintState::default()
        };
        let g = GradientState::default();
        let t = TextureState::default();
        assert_eq!(p.effective_mode(&g, &t), PaintMode::Flat);

        let g = GradientState {
            linear: Some(LinearGradient::new(
                0.0,
                0.0,
                1.0,
                0.0,
                &TransAffine::IDENTITY,
                GradientColorMap::two_color(
                    Rgba8::TRANSPARENT,
                    Rgba8::TRANSPARENT,
                    CycleMethod::NoCycle,
                ),
            )),
            radial: None,
        };
        assert_eq!(p.effective_mode(&g, &t), PaintMode::LinearGradient);
        assert_eq!(
            PaintSource::new(PaintMode::LinearGradient, &p, &g, &t).kind(),
            PaintKind::Generated
        );
    }

    #[test]
    fn test_texture_multiply_tints() {
        let mut p = PaintState {
            mode: PaintMode::TextureMultiply,
            ..PaintState::default()
        };
        p.set_color(Rgba8::new_opaque(255, 0, 0));
        let t = TextureState {
            texture: Some(texture()),
        };
        let g = GradientState::default();
        let src = PaintSource::new(p.effective_mode(&g, &t), &p, &g, &t);
        let mut span = [0u32; 2];
        src.generate(&mut span, 0, 0);
        assert_eq!(span, [0xFFFF_0000, 0x8080_0000]);

        let plain = PaintSource::new(PaintMode::Texture, &p, &g, &t);
        plain.generate(&mut span, 0, 0);
        assert_eq!(span, [0xFFFF_FFFF, 0x8080_8080]);
    }
}
