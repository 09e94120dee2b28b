//! Coverage masks.
//!
//! A [`Mask`] is a caller-supplied coverage image placed at an origin in
//! surface coordinates. Alpha masks carry one coverage byte per pixel; LCD
//! masks carry three (red, green, blue sub-pixels) and may start at a
//! sub-pixel offset within their first byte triple. Outside its rectangle a
//! mask contributes zero coverage.
//!
//! LCD coverage is composited in a gamma-decoded space; [`LcdGamma`] holds
//! the two lookup tables for that.

use thiserror::Error;

use crate::basics::{RectI, COVER_NONE};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MaskError {
    #[error("mask must have a non-zero size, got {width}x{height}")]
    Empty { width: u32, height: u32 },
    #[error("mask stride {stride} is smaller than one row ({needed} bytes)")]
    StrideTooSmall { stride: usize, needed: usize },
    #[error("mask data holds {len} bytes but {needed} are needed")]
    BufferTooSmall { len: usize, needed: usize },
    #[error("LCD sub-pixel offset must be 0, 1 or 2, got {0}")]
    SubpixelOffset(u8),
}

/// Layout of the coverage bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaskKind {
    Alpha,
    Lcd,
}

impl MaskKind {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            MaskKind::Alpha => 1,
            MaskKind::Lcd => 3,
        }
    }
}

// ============================================================================
// Mask
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask {
    kind: MaskKind,
    data: Vec<u8>,
    x: i32,
    y: i32,
    width: u32,
    height: u32,
    stride: usize,
    subpixel: usize,
}

impl Mask {
    /// One coverage byte per pixel, `stride` bytes per row.
    pub fn alpha(
        data: Vec<u8>,
        x: i32,
        y: i32,
        width: u32,
        height: u32,
        stride: usize,
    ) -> Result<Self, MaskError> {
        Self::build(MaskKind::Alpha, data, x, y, width, height, stride, 0)
    }

    /// Three coverage bytes per pixel. A non-zero `subpixel` shifts the
    /// sub-pixel grid right: the first pixel gets `subpixel` empty leading
    /// channels and one trailing partial pixel is added to each row.
    pub fn lcd(
        data: Vec<u8>,
        x: i32,
        y: i32,
        width: u32,
        height: u32,
        stride: usize,
        subpixel: u8,
    ) -> Result<Self, MaskError> {
        if subpixel > 2 {
            return Err(MaskError::SubpixelOffset(subpixel));
        }
        Self::build(MaskKind::Lcd, data, x, y, width, height, stride, subpixel as usize)
    }

    #[allow(clippy::too_many_arguments)]
    fn build(
        kind: MaskKind,
        data: Vec<u8>,
        x: i32,
        y: i32,
        width: u32,
        height: u32,
        stride: usize,
        subpixel: usize,
    ) -> Result<Self, MaskError> {
        if width == 0 || height == 0 {
            return Err(MaskError::Empty { width, height });
        }
        let row = width as usize * kind.bytes_per_pixel();
        if stride < row {
            return Err(MaskError::StrideTooSmall {
                stride,
                needed: row,
            });
        }
        let needed = (height as usize - 1) * stride + row;
        if data.len() < needed {
            return Err(MaskError::BufferTooSmall {
                len: data.len(),
                needed,
            });
        }
        Ok(Self {
            kind,
            data,
            x,
            y,
            width,
            height,
            stride,
            subpixel,
        })
    }

    pub fn kind(&self) -> MaskKind {
        self.kind
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Columns touched by the mask, including the trailing partial pixel of
    /// a shifted LCD grid.
    fn span_width(&self) -> u32 {
        self.width + (self.subpixel > 0) as u32
    }

    /// Inclusive rectangle covered by the mask, in surface coordinates.
    pub fn bounds(&self) -> RectI {
        RectI::new(
            self.x,
            self.y,
            self.x.saturating_add(self.span_width() as i32 - 1),
            self.y.saturating_add(self.height as i32 - 1),
        )
    }

    /// Row start and mask column for surface pixel (x, y).
    #[inline]
    fn locate(&self, x: i32, y: i32) -> Option<(usize, usize)> {
        let mx = x.checked_sub(self.x)?;
        let my = y.checked_sub(self.y)?;
        if mx < 0 || my < 0 || mx as u32 >= self.span_width() || my as u32 >= self.height {
            return None;
        }
        Some((my as usize * self.stride, mx as usize))
    }

    /// Sub-pixel coverages at surface pixel (x, y); alpha masks repeat their
    /// single value three times.
    #[inline]
    pub fn lcd_at(&self, x: i32, y: i32) -> [u8; 3] {
        let Some((row, mx)) = self.locate(x, y) else {
            return [COVER_NONE; 3];
        };
        match self.kind {
            MaskKind::Alpha => {
                let a = self.data.get(row + mx).copied().unwrap_or(COVER_NONE);
                [a; 3]
            }
            MaskKind::Lcd => {
                let row_bytes = self.width as usize * 3;
                let mut out = [COVER_NONE; 3];
                for (c, o) in out.iter_mut().enumerate() {
                    let byte = (mx * 3 + c).checked_sub(self.subpixel).filter(|&k| k < row_bytes);
                    if let Some(k) = byte {
                        *o = self.data.get(row + k).copied().unwrap_or(COVER_NONE);
                    }
                }
                out
            }
        }
    }

    /// Single coverage at surface pixel (x, y); LCD masks average their
    /// three sub-pixels.
    #[inline]
    pub fn alpha_at(&self, x: i32, y: i32) -> u8 {
        match self.kind {
            MaskKind::Alpha => match self.locate(x, y) {
                Some((row, mx)) => self.data.get(row + mx).copied().unwrap_or(COVER_NONE),
                None => COVER_NONE,
            },
            MaskKind::Lcd => {
                let [r, g, b] = self.lcd_at(x, y);
                ((r as u32 + g as u32 + b as u32 + 1) / 3) as u8
            }
        }
    }

    /// Fill `out` with single coverages for the run starting at (x, y).
    pub fn alpha_row(&self, x: i32, y: i32, out: &mut [u8]) {
        for (i, c) in out.iter_mut().enumerate() {
            *c = self.alpha_at(x.saturating_add(i as i32), y);
        }
    }

    /// Fill `out` with sub-pixel coverages for the run starting at (x, y).
    pub fn lcd_row(&self, x: i32, y: i32, out: &mut [[u8; 3]]) {
        for (i, c) in out.iter_mut().enumerate() {
            *c = self.lcd_at(x.saturating_add(i as i32), y);
        }
    }
}

// ============================================================================
// LCD gamma
// ============================================================================

pub const DEFAULT_LCD_GAMMA: f64 = 1.3;

/// Lookup tables for LCD blending:
/// `decode[v] = 255 * (v/255)^(1/gamma)` and
/// `encode[v] = 255 * (v/255)^gamma`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LcdGamma {
    decode: [u8; 256],
    encode: [u8; 256],
}

impl LcdGamma {
    /// Non-finite or non-positive gammas fall back to [`DEFAULT_LCD_GAMMA`].
    pub fn new(gamma: f64) -> Self {
        let gamma = if gamma.is_finite() && gamma > 0.0 {
            gamma
        } else {
            DEFAULT_LCD_GAMMA
        };
        let inv = 1.0 / gamma;
        let mut decode = [0u8; 256];
        let mut encode = [0u8; 256];
        for i in 0..256 {
            let v = i as f64 / 255.0;
            decode[i] = (255.0 * v.powf(inv) + 0.5) as u8;
            encode[i] = (255.0 * v.powf(gamma) + 0.5) as u8;
        }
        Self { decode, encode }
    }

    #[inline]
    pub fn decode(&self, v: u32) -> u32 {
        self.decode[(v & 0xFF) as usize] as u32
    }

    #[inline]
    pub fn encode(&self, v: u32) -> u32 {
        self.encode[(v & 0xFF) as usize] as u32
    }
}

impl Default for LcdGamma {
    fn default() -> Self {
        Self::new(DEFAULT_LCD_GAMMA)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alpha_mask_lookup() {
        let m = Mask::alpha(vec![10, 20, 30, 40, 50, 60], 5, 7, 3, 2, 3).unwrap();
        assert_eq!(m.bounds(), RectI::new(5, 7, 7, 8));
        assert_eq!(m.alpha_at(5, 7), 10);
        assert_eq!(m.alpha_at(7, 8), 60);
        assert_eq!(m.alpha_at(4, 7), 0);
        assert_eq!(m.alpha_at(5, 9), 0);
        assert_eq!(m.lcd_at(6, 8), [50; 3]);
    }

    #[test]
    fn test_lcd_mask_lookup() {
        let data = vec![255, 128, 64, 9, 9, 9];
        let m = Mask::lcd(data, 0, 0, 2, 1, 6, 0).unwrap();
        assert_eq!(m.bounds(), RectI::new(0, 0, 1, 0));
        assert_eq!(m.lcd_at(0, 0), [255, 128, 64]);
        assert_eq!(m.lcd_at(1, 0), [9, 9, 9]);
        assert_eq!(m.lcd_at(2, 0), [0; 3]);
        assert_eq!(m.alpha_at(0, 0), 149);
    }

    #[test]
    fn test_lcd_subpixel_offset_shifts_grid() {
        let data = vec![10, 20, 30, 40, 50, 60, 70, 80, 90, 100, 110, 120];
        let m = Mask::lcd(data.clone(), 4, 0, 2, 2, 6, 1).unwrap();
        // One trailing partial pixel per row.
        assert_eq!(m.bounds(), RectI::new(4, 0, 6, 1));
        assert_eq!(m.lcd_at(4, 0), [0, 10, 20]);
        assert_eq!(m.lcd_at(5, 0), [30, 40, 50]);
        assert_eq!(m.lcd_at(6, 0), [60, 0, 0]);
        assert_eq!(m.lcd_at(4, 1), [0, 70, 80]);
        assert_eq!(m.lcd_at(7, 0), [0; 3]);

        let m = Mask::lcd(data, 0, 0, 2, 2, 6, 2).unwrap();
        assert_eq!(m.lcd_at(0, 0), [0, 0, 10]);
        assert_eq!(m.lcd_at(1, 0), [20, 30, 40]);
        assert_eq!(m.lcd_at(2, 0), [50, 60, 0]);
    }

    #[test]
    fn test_mask_rows() {
        let m = Mask::alpha(vec![1, 2, 3], 1, 0, 3, 1, 3).unwrap();
        let mut out = [9u8; 5];
        m.alpha_row(0, 0, &mut out);
        assert_eq!(out, [0, 1, 2, 3, 0]);
        let mut lcd = [[9u8; 3]; 2];
        m.lcd_row(3, 0, &mut lcd);
        assert_eq!(lcd, [[3; 3], [0; 3]]);
    }

    #[test]
    fn test_mask_errors() {
        assert_eq!(
            Mask::alpha(vec![], 0, 0, 0, 1, 1),
            Err(MaskError::Empty {
                width: 0,
                height: 1
            })
        );
        assert_eq!(
            Mask::lcd(vec![0; 12], 0, 0, 2, 2, 5, 0),
            Err(MaskError::StrideTooSmall {
                stride: 5,
                needed: 6
            })
        );
        assert_eq!(
            Mask::lcd(vec![0; 12], 0, 0, 2, 2, 6, 3),
            Err(MaskError::SubpixelOffset(3))
        );
        assert_eq!(
            Mask::alpha(vec![0; 7], 0, 0, 4, 2, 4),
            Err(MaskError::BufferTooSmall { len: 7, needed: 8 })
        );
    }

    #[test]
    fn test_lcd_gamma_tables() {
        let g = LcdGamma::new(2.0);
        assert_eq!(g.decode(0), 0);
        assert_eq!(g.decode(255), 255);
        assert_eq!(g.encode(255), 255);
        assert!(g.decode(64) > 64);
        assert!(g.encode(64) < 64);
        assert_eq!(LcdGamma::new(f64::NAN), LcdGamma::default());
    }
}
