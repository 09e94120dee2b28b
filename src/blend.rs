//! Porter-Duff compositing of one row into a surface.
//!
//! The renderer picks a [`BlendRoutine`] once per configuration change from
//! the composite rule, the mask channel and the paint kind. Each row then
//! matches once on the surface format and once on the routine and runs a
//! loop that is generic over [`PixelRow`] and monomorphized per coverage and
//! source accessor, so the per-pixel code never branches on configuration.
//!
//! All math is on premultiplied 8-bit channels, normalized with
//! [`div255`].

use crate::basics::{div255, COVER_FULL};
use crate::color::{alpha_of, pack_argb, unpack_argb, Rgba8};
use crate::mask::LcdGamma;
use crate::paint::PaintKind;
use crate::surface::{PixelRow, RowMut};

// ============================================================================
// Configuration axes
// ============================================================================

/// Porter-Duff rule applied between paint and destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CompositeRule {
    /// Destination becomes transparent.
    Clear,
    /// Destination is replaced by the source, interpolated by coverage.
    Src,
    /// Source is composited over the destination.
    #[default]
    SrcOver,
}

/// Which per-pixel mask values modulate coverage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MaskChannel {
    None,
    Alpha,
    Lcd,
}

/// Concrete per-row routine for one `{rule × mask × paint}` combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendRoutine {
    Clear,
    SrcFlat,
    SrcPaint,
    SrcFlatMask,
    SrcPaintMask,
    SrcOverFlat,
    SrcOverPaint,
    SrcOverFlatMask,
    SrcOverPaintMask,
    SrcOverFlatLcd,
    SrcOverPaintLcd,
}

impl BlendRoutine {
    /// Pick the routine for a configuration.
    ///
    /// LCD masks only have sub-pixel routines for `SrcOver`; under `Src`
    /// their three coverages are averaged into an alpha mask.
    pub fn select(rule: CompositeRule, mask: MaskChannel, paint: PaintKind) -> Self {
        use BlendRoutine::*;
        let flat = paint == PaintKind::Flat;
        match (rule, mask) {
            (CompositeRule::Clear, _) => Clear,
            (CompositeRule::Src, MaskChannel::None) => pick(flat, SrcFlat, SrcPaint),
            (CompositeRule::Src, _) => pick(flat, SrcFlatMask, SrcPaintMask),
            (CompositeRule::SrcOver, MaskChannel::None) => pick(flat, SrcOverFlat, SrcOverPaint),
            (CompositeRule::SrcOver, MaskChannel::Alpha) => {
                pick(flat, SrcOverFlatMask, SrcOverPaintMask)
            }
            (CompositeRule::SrcOver, MaskChannel::Lcd) => {
                pick(flat, SrcOverFlatLcd, SrcOverPaintLcd)
            }
        }
    }

    /// Whether the routine reads generated paint colors.
    pub fn uses_paint(self) -> bool {
        matches!(
            self,
            BlendRoutine::SrcPaint
                | BlendRoutine::SrcPaintMask
                | BlendRoutine::SrcOverPaint
                | BlendRoutine::SrcOverPaintMask
                | BlendRoutine::SrcOverPaintLcd
        )
    }

    /// Which mask values the routine reads.
    pub fn mask_channel(self) -> MaskChannel {
        match self {
            BlendRoutine::SrcFlatMask
            | BlendRoutine::SrcPaintMask
            | BlendRoutine::SrcOverFlatMask
            | BlendRoutine::SrcOverPaintMask => MaskChannel::Alpha,
            BlendRoutine::SrcOverFlatLcd | BlendRoutine::SrcOverPaintLcd => MaskChannel::Lcd,
            _ => MaskChannel::None,
        }
    }
}

#[inline]
fn pick(flat: bool, f: BlendRoutine, p: BlendRoutine) -> BlendRoutine {
    if flat {
        f
    } else {
        p
    }
}

// ============================================================================
// Row input
// ============================================================================

/// Per-row inputs. Slices a routine does not read may be empty.
#[derive(Debug, Clone, Copy)]
pub struct BlendSpan<'a> {
    pub covers: &'a [u8],
    pub mask: &'a [u8],
    pub lcd: &'a [[u8; 3]],
    pub paint: &'a [u32],
    pub color: u32,
}

/// Composite one row of pixels with `routine`.
///
/// The number of pixels written is the shortest of the row and the inputs
/// the routine reads.
pub fn blend_row(
    routine: BlendRoutine,
    row: RowMut<'_>,
    span: &BlendSpan<'_>,
    gamma: &LcdGamma,
) {
    match row {
        RowMut::Int(mut r) => run(routine, &mut r, span, gamma),
        RowMut::Rgb565A(mut r) => run(routine, &mut r, span, gamma),
    }
}

fn run<R: PixelRow>(routine: BlendRoutine, row: &mut R, s: &BlendSpan<'_>, gamma: &LcdGamma) {
    let n = row.len().min(s.covers.len());
    let np = n.min(s.paint.len());
    let nm = n.min(s.mask.len());
    let nl = n.min(s.lcd.len());
    let (covers, mask, lcd, paint, color) = (s.covers, s.mask, s.lcd, s.paint, s.color);
    let masked = |i: usize| div255(covers[i] as u32 * mask[i] as u32);
    let plain = |i: usize| covers[i] as u32;

    match routine {
        BlendRoutine::Clear => {
            for i in 0..n {
                row.store(i, 0);
            }
        }
        BlendRoutine::SrcFlat => src_loop(row, n, plain, |_| color),
        BlendRoutine::SrcPaint => src_loop(row, np, plain, |i| paint[i]),
        BlendRoutine::SrcFlatMask => src_loop(row, nm, masked, |_| color),
        BlendRoutine::SrcPaintMask => src_loop(row, nm.min(np), masked, |i| paint[i]),
        BlendRoutine::SrcOverFlat => src_over_loop(row, n, plain, |_| color),
        BlendRoutine::SrcOverPaint => src_over_loop(row, np, plain, |i| paint[i]),
        BlendRoutine::SrcOverFlatMask => src_over_loop(row, nm, masked, |_| color),
        BlendRoutine::SrcOverPaintMask => src_over_loop(row, nm.min(np), masked, |i| paint[i]),
        BlendRoutine::SrcOverFlatLcd => lcd_loop(row, nl, covers, lcd, |_| color, gamma),
        BlendRoutine::SrcOverPaintLcd => {
            lcd_loop(row, nl.min(np), covers, lcd, |i| paint[i], gamma)
        }
    }
}

// ============================================================================
// Loops
// ============================================================================

#[inline]
fn src_loop<R, C, S>(row: &mut R, n: usize, cov: C, src: S)
where
    R: PixelRow,
    C: Fn(usize) -> u32,
    S: Fn(usize) -> u32,
{
    for i in 0..n {
        let a = cov(i);
        if a == 0 {
            continue;
        }
        if a >= COVER_FULL as u32 {
            row.store(i, src(i));
        } else {
            row.store(i, src_pixel(row.load(i), src(i), a));
        }
    }
}

#[inline]
fn src_over_loop<R, C, S>(row: &mut R, n: usize, cov: C, src: S)
where
    R: PixelRow,
    C: Fn(usize) -> u32,
    S: Fn(usize) -> u32,
{
    for i in 0..n {
        let a = cov(i);
        if a == 0 {
            continue;
        }
        let s = src(i);
        let sa = div255(alpha_of(s) * a);
        if sa == 255 {
            row.store(i, s);
        } else if s != 0 {
            row.store(i, src_over_pixel(row.load(i), s, a));
        }
    }
}

#[inline]
fn lcd_loop<R, S>(
    row: &mut R,
    n: usize,
    covers: &[u8],
    lcd: &[[u8; 3]],
    src: S,
    gamma: &LcdGamma,
) where
    R: PixelRow,
    S: Fn(usize) -> u32,
{
    for i in 0..n {
        let cov = covers[i] as u32;
        if cov == 0 {
            continue;
        }
        let s = src(i);
        let sa = alpha_of(s);
        let [m0, m1, m2] = lcd[i];
        let a = [m0, m1, m2].map(|m| div255(div255(cov * m as u32) * sa));
        if a == [0; 3] {
            continue;
        }
        let mut straight = Rgba8::from_argb(s);
        straight.demultiply();
        if a == [255; 3] {
            row.store(i, straight.to_argb() | 0xFF00_0000);
        } else {
            row.store(i, lcd_pixel(row.load(i), straight, a, gamma));
        }
    }
}

// ============================================================================
// Pixel math
// ============================================================================

/// `dst + (src - dst) * a / 255` per channel.
#[inline]
pub fn src_pixel(d: u32, s: u32, a: u32) -> u32 {
    let ia = 255 - a;
    let [da, dr, dg, db] = unpack_argb(d);
    let [sa, sr, sg, sb] = unpack_argb(s);
    pack_argb(
        div255(sa * a + da * ia),
        div255(sr * a + dr * ia),
        div255(sg * a + dg * ia),
        div255(sb * a + db * ia),
    )
}

/// Premultiplied source-over with the source scaled by coverage `a`.
#[inline]
pub fn src_over_pixel(d: u32, s: u32, a: u32) -> u32 {
    let [sa, sr, sg, sb] = unpack_argb(s);
    let [da, dr, dg, db] = unpack_argb(d);
    let ia = 255 - div255(sa * a);
    let ch = |sc: u32, dc: u32| (div255(sc * a) + div255(dc * ia)).min(255);
    pack_argb(ch(sa, da), ch(sr, dr), ch(sg, dg), ch(sb, db))
}

/// Sub-pixel source-over in gamma-decoded space; the result is opaque.
#[inline]
pub fn lcd_pixel(d: u32, s: Rgba8, a: [u32; 3], gamma: &LcdGamma) -> u32 {
    let [_, dr, dg, db] = unpack_argb(d);
    let ch = |sc: u8, dc: u32, ac: u32| {
        let o = ac * gamma.decode(sc as u32) + (255 - ac) * gamma.decode(dc);
        gamma.encode(div255(o))
    };
    pack_argb(
        0xFF,
        ch(s.r, dr, a[0]),
        ch(s.g, dg, a[1]),
        ch(s.b, db, a[2]),
    )
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::Surface;

    const RED: u32 = 0xFFFF_0000;
    const BLUE: u32 = 0xFF00_00FF;

    fn blend_into(buf: &mut [u32], routine: BlendRoutine, span: &BlendSpan<'_>) {
        let len = buf.len();
        let mut s = Surface::new_argb(buf, len as u32, 1).unwrap();
        let row = s.row_mut(0, 0, len).unwrap();
        blend_row(routine, row, span, &LcdGamma::default());
    }

    fn flat(covers: &[u8], color: u32) -> BlendSpan<'_> {
        BlendSpan {
            covers,
            mask: &[],
            lcd: &[],
            paint: &[],
            color,
        }
    }

    #[test]
    fn test_select_routines() {
        use BlendRoutine::*;
        let f = PaintKind::Flat;
        let g = PaintKind::Generated;
        assert_eq!(BlendRoutine::select(CompositeRule::Clear, MaskChannel::Lcd, g), Clear);
        assert_eq!(BlendRoutine::select(CompositeRule::Src, MaskChannel::None, f), SrcFlat);
        assert_eq!(BlendRoutine::select(CompositeRule::Src, MaskChannel::Lcd, g), SrcPaintMask);
        assert_eq!(
            BlendRoutine::select(CompositeRule::SrcOver, MaskChannel::Alpha, f),
            SrcOverFlatMask
        );
        assert_eq!(
            BlendRoutine::select(CompositeRule::SrcOver, MaskChannel::Lcd, g),
            SrcOverPaintLcd
        );
        assert!(SrcOverPaintLcd.uses_paint());
        assert!(!SrcOverFlatLcd.uses_paint());
        assert_eq!(SrcPaintMask.mask_channel(), MaskChannel::Alpha);
        assert_eq!(Clear.mask_channel(), MaskChannel::None);
    }

    #[test]
    fn test_clear_ignores_coverage_and_source() {
        let mut buf = [BLUE; 4];
        blend_into(&mut buf, BlendRoutine::Clear, &flat(&[0, 7, 255, 128], RED));
        assert_eq!(buf, [0; 4]);
    }

    #[test]
    fn test_src_over_full_coverage_replaces() {
        let mut buf = [BLUE, 0x8040_2010, 0];
        blend_into(&mut buf, BlendRoutine::SrcOverFlat, &flat(&[255; 3], RED));
        assert_eq!(buf, [RED; 3]);
    }

    #[test]
    fn test_zero_coverage_is_noop() {
        let before = [BLUE, 0x8040_2010, 0x0000_0000];
        for routine in [
            BlendRoutine::SrcFlat,
            BlendRoutine::SrcPaint,
            BlendRoutine::SrcOverFlat,
            BlendRoutine::SrcOverPaint,
            BlendRoutine::SrcOverFlatMask,
            BlendRoutine::SrcOverPaintLcd,
        ] {
            let mut buf = before;
            let span = BlendSpan {
                covers: &[0; 3],
                mask: &[255; 3],
                lcd: &[[255; 3]; 3],
                paint: &[RED; 3],
                color: RED,
            };
            blend_into(&mut buf, routine, &span);
            assert_eq!(buf, before, "{routine:?}");
        }
    }

    #[test]
    fn test_src_over_partial() {
        let mut buf = [BLUE];
        blend_into(&mut buf, BlendRoutine::SrcOverFlat, &flat(&[128], RED));
        assert_eq!(buf[0], 0xFF80_007F);

        // Translucent source over transparent keeps premultiplied form.
        let mut buf = [0];
        blend_into(&mut buf, BlendRoutine::SrcOverFlat, &flat(&[255], 0x8080_0000));
        assert_eq!(buf[0], 0x8080_0000);
    }

    #[test]
    fn test_src_interpolates_by_coverage() {
        let mut buf = [BLUE, BLUE, BLUE];
        blend_into(&mut buf, BlendRoutine::SrcFlat, &flat(&[255, 128, 0], 0x8080_0000));
        assert_eq!(buf[0], 0x8080_0000);
        assert_eq!(buf[1], 0xBF40_007F);
        assert_eq!(buf[2], BLUE);
    }

    #[test]
    fn test_mask_modulates_coverage() {
        let mut buf = [0u32; 3];
        let span = BlendSpan {
            covers: &[255, 255, 0],
            mask: &[255, 0, 255],
            lcd: &[],
            paint: &[],
            color: RED,
        };
        blend_into(&mut buf, BlendRoutine::SrcOverFlatMask, &span);
        assert_eq!(buf, [RED, 0, 0]);
    }

    #[test]
    fn test_paint_routine_reads_per_pixel_source() {
        let mut buf = [0u32; 2];
        let span = BlendSpan {
            covers: &[255, 255],
            mask: &[],
            lcd: &[],
            paint: &[RED, BLUE],
            color: 0,
        };
        blend_into(&mut buf, BlendRoutine::SrcOverPaint, &span);
        assert_eq!(buf, [RED, BLUE]);
    }

    #[test]
    fn test_lcd_blend() {
        let lcd = [[255u8; 3], [255, 0, 0], [0, 0, 0]];
        let span = BlendSpan {
            covers: &[255; 3],
            mask: &[],
            lcd: &lcd,
            paint: &[],
            color: 0xFFFF_FFFF,
        };
        let mut buf = [0xFF00_0000u32; 3];
        blend_into(&mut buf, BlendRoutine::SrcOverFlatLcd, &span);
        assert_eq!(buf[0], 0xFFFF_FFFF);
        assert_eq!(buf[1], 0xFFFF_0000);
        assert_eq!(buf[2], 0xFF00_0000);
    }

    #[test]
    fn test_lcd_partial_is_opaque() {
        let lcd = [[128u8, 64, 0]];
        let span = BlendSpan {
            covers: &[255],
            mask: &[],
            lcd: &lcd,
            paint: &[],
            color: 0xFFFF_FFFF,
        };
        let mut buf = [0u32];
        blend_into(&mut buf, BlendRoutine::SrcOverFlatLcd, &span);
        let [a, r, g, b] = unpack_argb(buf[0]);
        assert_eq!(a, 255);
        assert!(r > g && g > 0);
        assert_eq!(b, 0);
    }

    #[test]
    fn test_rgb565a_row() {
        let mut bytes = [0u8; 6];
        let mut s = Surface::new_rgb565a(&mut bytes, 2, 1, 0, 6, 3).unwrap();
        let row = s.row_mut(0, 0, 2).unwrap();
        blend_row(
            BlendRoutine::SrcOverFlat,
            row,
            &flat(&[255, 0], RED),
            &LcdGamma::default(),
        );
        assert_eq!(s.pixel(0, 0), Some(RED));
        assert_eq!(s.pixel(1, 0), Some(0));
    }

    #[test]
    fn test_src_over_never_overflows() {
        for sa in [1u32, 77, 128, 254, 255] {
            for a in [1u32, 64, 200, 255] {
                let s = pack_argb(sa, sa, sa / 2, 0);
                let out = src_over_pixel(0xFFFF_FFFF, s, a);
                assert_eq!(alpha_of(out), 255);
            }
        }
    }
}
