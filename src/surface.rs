//! Destination surface: a bounds-checked, non-owning view of pixel memory.
//!
//! A [`Surface`] borrows the caller's buffer and describes how pixels are laid
//! out in it: an element offset, a scanline stride and a pixel stride. Two
//! formats are supported:
//!
//! - [`PixelFormat::Argb8888Pre`]: one `u32` per pixel, premultiplied
//!   `0xAARRGGBB`. Offsets and strides count `u32` elements.
//! - [`PixelFormat::Rgb565A`]: three bytes per pixel, a little-endian RGB565
//!   word holding the premultiplied color followed by an alpha byte. Offsets
//!   and strides count bytes.
//!
//! Blend loops never compute addresses themselves: they ask for a [`RowMut`]
//! covering exactly the pixels they will touch, then read and write through
//! the [`PixelRow`] accessor pair for that format. Every access is a checked
//! slice index, so malformed spans can at worst be skipped, never write
//! outside the caller's buffer.

use thiserror::Error;

use crate::basics::RectI;
use crate::color::{pack_argb, unpack_argb};

// ============================================================================
// Errors
// ============================================================================

/// Reasons a caller-provided buffer cannot back a [`Surface`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SurfaceError {
    #[error("surface must have a non-zero size, got {width}x{height}")]
    Empty { width: u32, height: u32 },
    #[error("pixel stride {stride} is smaller than one {format:?} pixel")]
    PixelStrideTooSmall { stride: usize, format: PixelFormat },
    #[error("scanline stride {stride} is smaller than width * pixel stride ({needed})")]
    ScanlineStrideTooSmall { stride: usize, needed: usize },
    #[error("buffer holds {len} elements but the surface needs {needed}")]
    BufferTooSmall { len: usize, needed: usize },
}

// ============================================================================
// Pixel formats
// ============================================================================

/// Memory layout of a surface pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    Argb8888Pre,
    Rgb565A,
}

impl PixelFormat {
    /// Number of buffer elements one pixel occupies.
    pub fn pixel_size(self) -> usize {
        match self {
            PixelFormat::Argb8888Pre => 1,
            PixelFormat::Rgb565A => 3,
        }
    }
}

/// Encode a premultiplied ARGB value into the 565+alpha byte triple.
#[inline]
pub fn encode_565a(v: u32) -> [u8; 3] {
    let [a, r, g, b] = unpack_argb(v);
    let word = ((r >> 3) << 11) | ((g >> 2) << 5) | (b >> 3);
    [word as u8, (word >> 8) as u8, a as u8]
}

/// Decode a 565+alpha byte triple into premultiplied ARGB.
///
/// Channels are widened by bit replication and clamped to alpha so the
/// result stays a valid premultiplied color.
#[inline]
pub fn decode_565a(lo: u8, hi: u8, alpha: u8) -> u32 {
    let word = lo as u32 | ((hi as u32) << 8);
    let r5 = (word >> 11) & 0x1F;
    let g6 = (word >> 5) & 0x3F;
    let b5 = word & 0x1F;
    let a = alpha as u32;
    let r = ((r5 << 3) | (r5 >> 2)).min(a);
    let g = ((g6 << 2) | (g6 >> 4)).min(a);
    let b = ((b5 << 3) | (b5 >> 2)).min(a);
    pack_argb(a, r, g, b)
}

// ============================================================================
// Row accessors
// ============================================================================

/// Format-specialized read/write access to a run of pixels on one row.
///
/// Index `i` addresses the `i`-th pixel of the run; values are always
/// premultiplied ARGB regardless of the storage format.
pub trait PixelRow {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn load(&self, i: usize) -> u32;
    fn store(&mut self, i: usize, v: u32);
}

/// Run of `u32` ARGB pixels.
pub struct IntRow<'s> {
    data: &'s mut [u32],
    pixel_stride: usize,
    len: usize,
}

impl PixelRow for IntRow<'_> {
    #[inline]
    fn len(&self) -> usize {
        self.len
    }

    #[inline]
    fn load(&self, i: usize) -> u32 {
        self.data[i * self.pixel_stride]
    }

    #[inline]
    fn store(&mut self, i: usize, v: u32) {
        self.data[i * self.pixel_stride] = v;
    }
}

/// Run of 565+alpha pixels.
pub struct Rgb565ARow<'s> {
    data: &'s mut [u8],
    pixel_stride: usize,
    len: usize,
}

impl PixelRow for Rgb565ARow<'_> {
    #[inline]
    fn len(&self) -> usize {
        self.len
    }

    #[inline]
    fn load(&self, i: usize) -> u32 {
        let off = i * self.pixel_stride;
        decode_565a(self.data[off], self.data[off + 1], self.data[off + 2])
    }

    #[inline]
    fn store(&mut self, i: usize, v: u32) {
        let off = i * self.pixel_stride;
        self.data[off..off + 3].copy_from_slice(&encode_565a(v));
    }
}

/// A row run in whichever format the surface stores.
///
/// Callers match on this once per row and run a loop generic over
/// [`PixelRow`], so the per-pixel code never branches on format.
pub enum RowMut<'s> {
    Int(IntRow<'s>),
    Rgb565A(Rgb565ARow<'s>),
}

// ============================================================================
// Surface
// ============================================================================

enum SurfaceData<'a> {
    Int(&'a mut [u32]),
    Byte(&'a mut [u8]),
}

/// Non-owning destination pixel buffer descriptor.
pub struct Surface<'a> {
    data: SurfaceData<'a>,
    format: PixelFormat,
    width: u32,
    height: u32,
    offset: usize,
    scanline_stride: usize,
    pixel_stride: usize,
}

impl<'a> Surface<'a> {
    /// Wrap a tightly packed ARGB buffer of `width * height` pixels.
    pub fn new_argb(data: &'a mut [u32], width: u32, height: u32) -> Result<Self, SurfaceError> {
        Self::new_argb_strided(data, width, height, 0, width as usize, 1)
    }

    /// Wrap an ARGB buffer with explicit offset and strides (in `u32` units).
    pub fn new_argb_strided(
        data: &'a mut [u32],
        width: u32,
        height: u32,
        offset: usize,
        scanline_stride: usize,
        pixel_stride: usize,
    ) -> Result<Self, SurfaceError> {
        let format = PixelFormat::Argb8888Pre;
        check_layout(data.len(), format, width, height, offset, scanline_stride, pixel_stride)?;
        Ok(Self {
            data: SurfaceData::Int(data),
            format,
            width,
            height,
            offset,
            scanline_stride,
            pixel_stride,
        })
    }

    /// Wrap a 565+alpha byte buffer with explicit offset and strides (in bytes).
    pub fn new_rgb565a(
        data: &'a mut [u8],
        width: u32,
        height: u32,
        offset: usize,
        scanline_stride: usize,
        pixel_stride: usize,
    ) -> Result<Self, SurfaceError> {
        let format = PixelFormat::Rgb565A;
        check_layout(data.len(), format, width, height, offset, scanline_stride, pixel_stride)?;
        Ok(Self {
            data: SurfaceData::Byte(data),
            format,
            width,
            height,
            offset,
            scanline_stride,
            pixel_stride,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn scanline_stride(&self) -> usize {
        self.scanline_stride
    }

    pub fn pixel_stride(&self) -> usize {
        self.pixel_stride
    }

    /// Inclusive pixel bounds `(0, 0)..(width-1, height-1)`.
    pub fn bounds(&self) -> RectI {
        RectI::new(0, 0, self.width as i32 - 1, self.height as i32 - 1)
    }

    /// Element index of pixel (x, y), or `None` outside the surface.
    #[inline]
    pub fn index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x as u32 >= self.width || y as u32 >= self.height {
            return None;
        }
        Some(self.offset + y as usize * self.scanline_stride + x as usize * self.pixel_stride)
    }

    /// Read pixel (x, y) as premultiplied ARGB.
    pub fn pixel(&self, x: i32, y: i32) -> Option<u32> {
        let idx = self.index(x, y)?;
        match &self.data {
            SurfaceData::Int(d) => d.get(idx).copied(),
            SurfaceData::Byte(d) => d.get(idx..idx + 3).map(|p| decode_565a(p[0], p[1], p[2])),
        }
    }

    /// Overwrite pixel (x, y). Returns `false` if it lies outside the surface.
    pub fn set_pixel(&mut self, x: i32, y: i32, v: u32) -> bool {
        match self.row_mut(x, y, 1) {
            Some(RowMut::Int(mut row)) => row.store(0, v),
            Some(RowMut::Rgb565A(mut row)) => row.store(0, v),
            None => return false,
        }
        true
    }

    /// Borrow the run of `len` pixels starting at (x, y).
    ///
    /// Returns `None` unless the whole run lies inside the surface.
    pub fn row_mut(&mut self, x: i32, y: i32, len: usize) -> Option<RowMut<'_>> {
        if len == 0 || x < 0 || (x as usize + len) > self.width as usize {
            return None;
        }
        let start = self.index(x, y)?;
        let unit = self.format.pixel_size();
        let end = start + (len - 1) * self.pixel_stride + unit;
        let pixel_stride = self.pixel_stride;
        match &mut self.data {
            SurfaceData::Int(d) => d.get_mut(start..end).map(|data| {
                RowMut::Int(IntRow {
                    data,
                    pixel_stride,
                    len,
                })
            }),
            SurfaceData::Byte(d) => d.get_mut(start..end).map(|data| {
                RowMut::Rgb565A(Rgb565ARow {
                    data,
                    pixel_stride,
                    len,
                })
            }),
        }
    }

    /// Overwrite the rectangle `(x, y, w, h)`, clipped to the surface, with `v`.
    pub fn clear_rect(&mut self, x: i32, y: i32, w: i32, h: i32, v: u32) {
        if w <= 0 || h <= 0 {
            return;
        }
        let mut r = RectI::new(x, y, x.saturating_add(w - 1), y.saturating_add(h - 1));
        if !r.clip(&self.bounds()) {
            return;
        }
        let len = r.width() as usize;
        for yy in r.y1..=r.y2 {
            match self.row_mut(r.x1, yy, len) {
                Some(RowMut::Int(mut row)) => fill_row(&mut row, v),
                Some(RowMut::Rgb565A(mut row)) => fill_row(&mut row, v),
                None => {}
            }
        }
    }
}

fn fill_row<R: PixelRow>(row: &mut R, v: u32) {
    for i in 0..row.len() {
        row.store(i, v);
    }
}

fn check_layout(
    len: usize,
    format: PixelFormat,
    width: u32,
    height: u32,
    offset: usize,
    scanline_stride: usize,
    pixel_stride: usize,
) -> Result<(), SurfaceError> {
    if width == 0 || height == 0 {
        return Err(SurfaceError::Empty { width, height });
    }
    let unit = format.pixel_size();
    if pixel_stride < unit {
        return Err(SurfaceError::PixelStrideTooSmall {
            stride: pixel_stride,
            format,
        });
    }
    let row_span = width as usize * pixel_stride;
    if scanline_stride < row_span {
        return Err(SurfaceError::ScanlineStrideTooSmall {
            stride: scanline_stride,
            needed: row_span,
        });
    }
    let needed = offset
        + (height as usize - 1) * scanline_stride
        + (width as usize - 1) * pixel_stride
        + unit;
    if len < needed {
        return Err(SurfaceError::BufferTooSmall { len, needed });
    }
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
