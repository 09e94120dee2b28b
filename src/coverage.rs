//! Scanline coverage accumulation.
//!
//! Turns the edge crossings of one output row into per-pixel coverage in
//! `0..=255`. With anti-aliasing the row is described by up to
//! [`NUM_ALPHA_ROWS`] sub-scanlines, each sampled at [`SUBPIXEL_SCALE`]
//! positions per pixel, so a pixel collects at most 64 samples. Spans are
//! added into a delta array (one increment at the span start, one decrement
//! past its end, split across the two pixels a partial edge touches) and
//! resolved with a running sum, so the cost per span is constant regardless
//! of its length.
//!
//! Without anti-aliasing only the middle sub-scanline is used and a pixel is
//! inside when its centre is.

use log::trace;

use crate::basics::{FillRule, COVER_FULL};

/// Maximum sub-scanlines per output row.
pub const NUM_ALPHA_ROWS: usize = 8;

pub const SUBPIXEL_SHIFT: u32 = 3;
pub const SUBPIXEL_SCALE: i64 = 1 << SUBPIXEL_SHIFT;
pub const SUBPIXEL_MASK: i64 = SUBPIXEL_SCALE - 1;

// ============================================================================
// Crossings
// ============================================================================

/// One edge crossing a scanline: x position and winding direction (+1/-1).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Crossing {
    pub x: f64,
    pub dir: i32,
}

impl Crossing {
    pub fn new(x: f64, dir: i32) -> Self {
        Self { x, dir }
    }
}

/// Crossing lists for the sub-scanlines of one output row.
///
/// Sub-rows are stored back to back in one buffer; `ends[i]` is one past the
/// last crossing of sub-row `i`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanlineEdges {
    crossings: Vec<Crossing>,
    ends: Vec<usize>,
}

impl ScanlineEdges {
    pub fn new() -> Self {
        Self::default()
    }

    /// Edges for a row described by a single sub-scanline.
    pub fn single(crossings: &[Crossing]) -> Self {
        let mut e = Self::new();
        e.push_row(crossings);
        e
    }

    /// Append the crossings of the next sub-scanline (top to bottom).
    pub fn push_row(&mut self, crossings: &[Crossing]) {
        self.crossings.extend_from_slice(crossings);
        self.ends.push(self.crossings.len());
    }

    pub fn clear(&mut self) {
        self.crossings.clear();
        self.ends.clear();
    }

    pub fn num_rows(&self) -> usize {
        self.ends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ends.is_empty()
    }

    /// Crossings of sub-row `i`.
    pub fn row(&self, i: usize) -> &[Crossing] {
        let start = if i == 0 { 0 } else { self.ends[i - 1] };
        match self.ends.get(i) {
            Some(&end) => &self.crossings[start..end],
            None => &[],
        }
    }
}

// ============================================================================
// CoverageRow
// ============================================================================

/// Coverage for one output row, starting at surface column `x`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoverageRow<'a> {
    pub x: i32,
    pub covers: &'a [u8],
}

impl CoverageRow<'_> {
    /// Last covered column (inclusive).
    pub fn x_end(&self) -> i32 {
        self.x + self.covers.len() as i32 - 1
    }
}

// ============================================================================
// CoverageAccumulator
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct CoverageAccumulator {
    deltas: Vec<i32>,
    covers: Vec<u8>,
    scratch: Vec<Crossing>,
    alpha_map: Vec<u8>,
    alpha_rows: usize,
}

impl CoverageAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild the sample-count to coverage map for `rows` sub-scanlines.
    fn set_alpha_rows(&mut self, rows: usize) {
        if rows == self.alpha_rows {
            return;
        }
        let max = (rows as i64 * SUBPIXEL_SCALE) as u32;
        self.alpha_map.clear();
        self.alpha_map
            .extend((0..=max).map(|c| ((c * COVER_FULL as u32 + max / 2) / max) as u8));
        self.alpha_rows = rows;
    }

    /// Accumulate the crossings of one row, restricted to the inclusive column
    /// range `clip_x1..=clip_x2`.
    ///
    /// Returns the covered run, or `None` when nothing inside the range is
    /// covered. Non-finite crossings are dropped and out-of-range x values are
    /// clamped to the range, so malformed rows degrade to partial or no
    /// coverage.
    pub fn accumulate(
        &mut self,
        edges: &ScanlineEdges,
        rule: FillRule,
        clip_x1: i32,
        clip_x2: i32,
        antialias: bool,
    ) -> Option<CoverageRow<'_>> {
        if clip_x2 < clip_x1 || edges.is_empty() {
            return None;
        }
        let width = (clip_x2 as i64 - clip_x1 as i64 + 1) as usize;
        if self.deltas.len() < width + 2 {
            self.deltas.resize(width + 2, 0);
            self.covers.resize(width, 0);
        }

        let (first, count) = if antialias {
            (0, edges.num_rows().min(NUM_ALPHA_ROWS))
        } else {
            (edges.num_rows() / 2, 1)
        };
        self.set_alpha_rows(count);

        let mut min_x = usize::MAX;
        let mut max_x = 0usize;
        let limit = width as i64 * SUBPIXEL_SCALE;
        let mut scratch = std::mem::take(&mut self.scratch);
        for r in first..first + count {
            scratch.clear();
            for c in edges.row(r) {
                if c.x.is_finite() {
                    scratch.push(*c);
                } else {
                    trace!("dropping non-finite crossing {:?}", c);
                }
            }
            scratch.sort_by(|a, b| a.x.total_cmp(&b.x));

            let mut winding = 0i32;
            let mut start = 0.0;
            for c in &scratch {
                let was = rule.is_inside(winding);
                winding = winding.saturating_add(c.dir);
                let now = rule.is_inside(winding);
                if !was && now {
                    start = c.x;
                } else if was && !now {
                    let x0 = sample_pos(start, clip_x1, antialias, limit);
                    let x1 = sample_pos(c.x, clip_x1, antialias, limit);
                    if x0 < x1 {
                        self.add_span(x0, x1);
                        min_x = min_x.min((x0 >> SUBPIXEL_SHIFT) as usize);
                        max_x = max_x.max(((x1 - 1) >> SUBPIXEL_SHIFT) as usize);
                    }
                }
            }
        }
        self.scratch = scratch;

        if min_x > max_x {
            trace!("row has no coverage in {clip_x1}..={clip_x2}");
            return None;
        }

        let mut sum = 0i32;
        for x in min_x..=max_x {
            sum += self.deltas[x];
            self.covers[x] = self
                .alpha_map
                .get(sum.max(0) as usize)
                .copied()
                .unwrap_or(COVER_FULL);
        }
        self.deltas[min_x..=max_x + 1].fill(0);

        Some(CoverageRow {
            x: clip_x1 + min_x as i32,
            covers: &self.covers[min_x..=max_x],
        })
    }

    /// Add the sub-sample run `[x0, x1)` of one sub-scanline.
    #[inline]
    fn add_span(&mut self, x0: i64, x1: i64) {
        let px0 = (x0 >> SUBPIXEL_SHIFT) as usize;
        let px_last = ((x1 - 1) >> SUBPIXEL_SHIFT) as usize;
        if px0 == px_last {
            let n = (x1 - x0) as i32;
            self.deltas[px0] += n;
            self.deltas[px0 + 1] -= n;
        } else {
            let f0 = (x0 & SUBPIXEL_MASK) as i32;
            let px1 = (x1 >> SUBPIXEL_SHIFT) as usize;
            let f1 = (x1 & SUBPIXEL_MASK) as i32;
            let full = SUBPIXEL_SCALE as i32;
            self.deltas[px0] += full - f0;
            self.deltas[px0 + 1] += f0;
            self.deltas[px1] -= full - f1;
            self.deltas[px1 + 1] -= f1;
        }
    }
}

/// First sample at or right of `x`, in sub-samples from `clip_x1`, clamped
/// to `0..=limit`. Samples sit at sub-pixel centres (anti-aliased) or at
/// pixel centres.
#[inline]
fn sample_pos(x: f64, clip_x1: i32, antialias: bool, limit: i64) -> i64 {
    let rel = x - clip_x1 as f64;
    let s = if antialias {
        (rel * SUBPIXEL_SCALE as f64 - 0.5).ceil()
    } else {
        (rel - 0.5).ceil() * SUBPIXEL_SCALE as f64
    };
    s.clamp(0.0, limit as f64) as i64
}

// ============================================================================
// Tests
// ============================================================================
