//! Scanline renderer: state, dispatch and orchestration.
//!
//! A [`Renderer`] owns the paint, mask and clip configuration and borrows a
//! destination [`Surface`]. For each row it asks the
//! [`CoverageAccumulator`] for coverage, generates paint for the covered run
//! and hands both to the [`BlendRoutine`] selected when the configuration
//! last changed. Pixels touched are folded into a bounding box the caller
//! can query for damage reporting.
//!
//! Render calls never fail. Without a surface they do nothing; degenerate
//! configuration (empty clip, missing gradient, singular transform) paints
//! an inert fallback and logs at `debug` level.

use log::{debug, trace};

use crate::basics::{ifloor, FillRule, RectI, COVER_FULL, FIXED_ONE, FIXED_SHIFT};
use crate::blend::{blend_row, BlendRoutine, BlendSpan, CompositeRule, MaskChannel};
use crate::color::Rgba8;
use crate::coverage::{CoverageAccumulator, ScanlineEdges};
use crate::gradient::{CycleMethod, GradientColorMap, GradientStop, LinearGradient, RadialGradient};
use crate::mask::{LcdGamma, Mask, MaskKind, DEFAULT_LCD_GAMMA};
use crate::paint::{GradientState, PaintMode, PaintSource, PaintState, SpanGenerator, TextureState};
use crate::surface::Surface;
use crate::texture::TextureSource;
use crate::trans_affine::TransAffine;

// ============================================================================
// Options
// ============================================================================

/// Construction-time renderer options.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RendererOptions {
    pub antialiasing: bool,
    /// Gamma used when compositing LCD masks.
    pub lcd_gamma: f64,
}

impl Default for RendererOptions {
    fn default() -> Self {
        Self {
            antialiasing: true,
            lcd_gamma: DEFAULT_LCD_GAMMA,
        }
    }
}

// ============================================================================
// State
// ============================================================================

/// Bound mask, if any.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MaskState {
    pub mask: Option<Mask>,
}

impl MaskState {
    pub fn channel(&self) -> MaskChannel {
        match self.mask.as_ref().map(Mask::kind) {
            None => MaskChannel::None,
            Some(MaskKind::Alpha) => MaskChannel::Alpha,
            Some(MaskKind::Lcd) => MaskChannel::Lcd,
        }
    }
}

/// Requested clip box and its intersection with the surface bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClipState {
    requested: Option<RectI>,
    effective: RectI,
}

impl Default for ClipState {
    fn default() -> Self {
        Self {
            requested: None,
            effective: RectI::EMPTY,
        }
    }
}

impl ClipState {
    /// Inclusive clip box, always inside the surface; empty without one.
    pub fn effective(&self) -> RectI {
        self.effective
    }

    pub fn is_empty(&self) -> bool {
        !self.effective.is_valid()
    }

    fn set(&mut self, r: RectI, surface: Option<RectI>) {
        self.requested = Some(r);
        self.resolve(surface);
    }

    fn reset(&mut self, surface: Option<RectI>) {
        self.requested = None;
        self.resolve(surface);
    }

    fn resolve(&mut self, surface: Option<RectI>) {
        self.effective = match (surface, self.requested) {
            (None, _) => RectI::EMPTY,
            (Some(bounds), None) => bounds,
            (Some(bounds), Some(mut r)) => {
                if r.clip(&bounds) {
                    r
                } else {
                    RectI::EMPTY
                }
            }
        };
    }
}

/// All configuration a render pass reads, grouped by concern.
#[derive(Debug, Clone, Default)]
pub struct RendererState {
    pub paint: PaintState,
    pub gradients: GradientState,
    pub textures: TextureState,
    pub mask: MaskState,
    pub clip: ClipState,
    pub rule: CompositeRule,
    pub antialiasing: bool,
    current_row: i32,
    touched: Option<RectI>,
    valid: bool,
}

impl RendererState {
    fn touch(&mut self, x1: i32, x2: i32, y: i32) {
        match &mut self.touched {
            Some(r) => r.add_hspan(x1, x2, y),
            None => self.touched = Some(RectI::new(x1, y, x2, y)),
        }
    }
}

#[derive(Debug, Default)]
struct RowScratch {
    paint: Vec<u32>,
    mask: Vec<u8>,
    lcd: Vec<[u8; 3]>,
}

// ============================================================================
// Renderer
// ============================================================================

pub struct Renderer<'a> {
    surface: Option<Surface<'a>>,
    state: RendererState,
    gamma: LcdGamma,
    coverage: CoverageAccumulator,
    routine: BlendRoutine,
    paint_mode: PaintMode,
    scratch: RowScratch,
    covers: Vec<u8>,
}

impl<'a> Renderer<'a> {
    /// A renderer with no surface; render calls are no-ops until one is
    /// attached.
    pub fn new(options: RendererOptions) -> Self {
        let state = RendererState {
            antialiasing: options.antialiasing,
            ..RendererState::default()
        };
        let mut r = Self {
            surface: None,
            state,
            gamma: LcdGamma::new(options.lcd_gamma),
            coverage: CoverageAccumulator::new(),
            routine: BlendRoutine::SrcOverFlat,
            paint_mode: PaintMode::Flat,
            scratch: RowScratch::default(),
            covers: Vec::new(),
        };
        r.refresh();
        r
    }

    pub fn with_surface(surface: Surface<'a>, options: RendererOptions) -> Self {
        let mut r = Self::new(options);
        r.attach_surface(surface);
        r
    }

    pub fn state(&self) -> &RendererState {
        &self.state
    }

    /// The routine rows are currently composited with.
    pub fn routine(&self) -> BlendRoutine {
        self.routine
    }

    /// Set paint mode, composite rule and anti-aliasing together.
    pub fn configure(&mut self, mode: PaintMode, rule: CompositeRule, antialiasing: bool) {
        self.state.paint.mode = mode;
        self.state.rule = rule;
        self.state.antialiasing = antialiasing;
        self.refresh();
    }

    fn refresh(&mut self) {
        let st = &self.state;
        self.paint_mode = st.paint.effective_mode(&st.gradients, &st.textures);
        self.routine = BlendRoutine::select(st.rule, st.mask.channel(), self.paint_mode.kind());
    }

    // ------------------------------------------------------------------------
    // Surface lifecycle
    // ------------------------------------------------------------------------

    /// Attach a destination surface, making the renderer valid. Any
    /// previously attached surface is returned.
    pub fn attach_surface(&mut self, surface: Surface<'a>) -> Option<Surface<'a>> {
        let bounds = surface.bounds();
        let old = self.surface.replace(surface);
        self.state.valid = true;
        self.state.clip.resolve(Some(bounds));
        old
    }

    /// Detach the surface. Render calls become no-ops until the next attach.
    pub fn detach_surface(&mut self) -> Option<Surface<'a>> {
        self.state.valid = false;
        self.state.clip.resolve(None);
        self.surface.take()
    }

    pub fn surface(&self) -> Option<&Surface<'a>> {
        self.surface.as_ref()
    }

    pub fn is_valid(&self) -> bool {
        self.state.valid && self.surface.is_some()
    }

    // ------------------------------------------------------------------------
    // Clip and damage tracking
    // ------------------------------------------------------------------------

    /// Restrict rendering to the inclusive box `(x1, y1)..(x2, y2)`,
    /// intersected with the surface.
    pub fn set_clip(&mut self, x1: i32, y1: i32, x2: i32, y2: i32) {
        let bounds = self.surface.as_ref().map(Surface::bounds);
        self.state.clip.set(RectI::new(x1, y1, x2, y2), bounds);
        if bounds.is_some() && self.state.clip.is_empty() {
            debug!("clip box ({x1},{y1})-({x2},{y2}) is empty; rows will be skipped");
        }
    }

    /// Clip to the whole surface.
    pub fn reset_clip(&mut self) {
        let bounds = self.surface.as_ref().map(Surface::bounds);
        self.state.clip.reset(bounds);
    }

    pub fn clip_box(&self) -> RectI {
        self.state.clip.effective()
    }

    /// Inclusive bounding box of every pixel written since the last reset.
    pub fn touched_bounds(&self) -> Option<RectI> {
        self.state.touched
    }

    pub fn reset_touched(&mut self) {
        self.state.touched = None;
    }

    /// Row index of the last `render_row` call.
    pub fn current_row(&self) -> i32 {
        self.state.current_row
    }

    // ------------------------------------------------------------------------
    // Paint configuration
    // ------------------------------------------------------------------------

    /// Flat color, given with straight alpha.
    pub fn set_color(&mut self, c: Rgba8) {
        self.state.paint.set_color(c);
    }

    pub fn set_paint_mode(&mut self, mode: PaintMode) {
        self.state.paint.mode = mode;
        self.refresh();
    }

    pub fn set_composite_rule(&mut self, rule: CompositeRule) {
        self.state.rule = rule;
        self.refresh();
    }

    pub fn set_antialiasing(&mut self, on: bool) {
        self.state.antialiasing = on;
    }

    /// Linear gradient from `p0` to `p1` in gradient space, mapped to the
    /// surface by `transform`.
    pub fn set_linear_gradient(
        &mut self,
        p0: (f64, f64),
        p1: (f64, f64),
        stops: &[GradientStop],
        cycle: CycleMethod,
        transform: &TransAffine,
    ) {
        let map = GradientColorMap::new(stops, cycle);
        self.state.gradients.linear =
            Some(LinearGradient::new(p0.0, p0.1, p1.0, p1.1, transform, map));
        self.refresh();
    }

    /// Radial gradient around `center` with its focus at `focus`.
    pub fn set_radial_gradient(
        &mut self,
        center: (f64, f64),
        focus: (f64, f64),
        radius: f64,
        stops: &[GradientStop],
        cycle: CycleMethod,
        transform: &TransAffine,
    ) {
        let map = GradientColorMap::new(stops, cycle);
        self.state.gradients.radial = Some(RadialGradient::new(
            center.0, center.1, focus.0, focus.1, radius, transform, map,
        ));
        self.refresh();
    }

    pub fn set_texture(&mut self, texture: TextureSource) {
        self.state.textures.texture = Some(texture);
        self.refresh();
    }

    pub fn clear_texture(&mut self) {
        self.state.textures.texture = None;
        self.refresh();
    }

    pub fn set_mask(&mut self, mask: Option<Mask>) {
        self.state.mask.mask = mask;
        self.refresh();
    }

    // ------------------------------------------------------------------------
    // Rendering
    // ------------------------------------------------------------------------

    fn row_visible(&self, y: i32) -> bool {
        if !self.is_valid() {
            trace!("row {y}: renderer has no surface");
            return false;
        }
        let clip = self.state.clip.effective();
        if !clip.is_valid() || y < clip.y1 || y > clip.y2 {
            trace!("row {y}: outside clip box");
            return false;
        }
        true
    }

    /// Fill one scanline from its edge crossings.
    pub fn render_row(&mut self, y: i32, edges: &ScanlineEdges, rule: FillRule) {
        self.state.current_row = y;
        if !self.row_visible(y) {
            return;
        }
        let clip = self.state.clip.effective();
        let Some(row) =
            self.coverage
                .accumulate(edges, rule, clip.x1, clip.x2, self.state.antialiasing)
        else {
            return;
        };
        let (x, covers) = (row.x, row.covers);
        if let Some(surface) = self.surface.as_mut() {
            if emit_row(
                surface,
                &self.state,
                &mut self.scratch,
                &self.gamma,
                self.routine,
                self.paint_mode,
                x,
                y,
                covers,
            ) {
                self.state.touch(x, x + covers.len() as i32 - 1, y);
            }
        }
    }

    /// Fill the rectangle `[x, x+w) × [y, y+h)`; partially covered edge
    /// pixels get coverage proportional to the covered area.
    pub fn fill_rect(&mut self, x: f64, y: f64, w: f64, h: f64) {
        if !self.is_valid() {
            trace!("fill_rect: renderer has no surface");
            return;
        }
        if !(w > 0.0 && h > 0.0) || ![x, y, w, h].iter().all(|v| v.is_finite()) {
            debug!("fill_rect: degenerate rectangle {x},{y} {w}x{h}");
            return;
        }
        let clip = self.state.clip.effective();
        if !clip.is_valid() {
            return;
        }
        let x0 = x.max(clip.x1 as f64);
        let x1 = (x + w).min(clip.x2 as f64 + 1.0);
        let y0 = y.max(clip.y1 as f64);
        let y1 = (y + h).min(clip.y2 as f64 + 1.0);
        if x0 >= x1 || y0 >= y1 {
            return;
        }

        let px0 = ifloor(x0);
        let px1 = ifloor(x1 - f64::EPSILON * x1.abs().max(1.0)).max(px0);
        let py0 = ifloor(y0);
        let py1 = ifloor(y1 - f64::EPSILON * y1.abs().max(1.0)).max(py0);
        let n = (px1 - px0 + 1) as usize;

        // Horizontal 16.16 coverage: partial left/right columns, full inside.
        let lfrac = to_frac((px0 + 1) as f64).min(to_frac(x1)) - to_frac(x0);
        let rfrac = to_frac(x1) - to_frac(px1 as f64);
        let mut hcov = vec![FIXED_ONE as i64; n];
        if n == 1 {
            hcov[0] = to_frac(x1) - to_frac(x0);
        } else {
            hcov[0] = lfrac;
            hcov[n - 1] = rfrac;
        }

        for py in py0..=py1 {
            let top = y0.max(py as f64);
            let bottom = y1.min(py as f64 + 1.0);
            let vfrac = to_frac(bottom) - to_frac(top);
            self.covers.clear();
            self.covers.extend(hcov.iter().map(|&h| fixed_cover(h, vfrac)));
            self.emit_covers(px0, py);
        }
    }

    /// Composite the bound mask's rectangle with the active paint, using the
    /// mask values alone as coverage.
    pub fn fill_mask(&mut self) {
        if !self.is_valid() {
            trace!("fill_mask: renderer has no surface");
            return;
        }
        let Some(mut r) = self.state.mask.mask.as_ref().map(Mask::bounds) else {
            debug!("fill_mask: no mask bound");
            return;
        };
        if !r.clip(&self.state.clip.effective()) {
            return;
        }
        let n = r.width() as usize;
        for y in r.y1..=r.y2 {
            self.covers.clear();
            self.covers.resize(n, COVER_FULL);
            self.emit_covers(r.x1, y);
        }
    }

    /// Overwrite `(x, y, w, h)`, clipped, with the flat color.
    pub fn clear_rect(&mut self, x: i32, y: i32, w: i32, h: i32) {
        if w <= 0 || h <= 0 {
            return;
        }
        let mut r = RectI::new(x, y, x.saturating_add(w - 1), y.saturating_add(h - 1));
        if !self.is_valid() || !r.clip(&self.state.clip.effective()) {
            trace!("clear_rect: nothing to clear");
            return;
        }
        let color = self.state.paint.color_pre();
        if let Some(surface) = self.surface.as_mut() {
            surface.clear_rect(r.x1, r.y1, r.width(), r.height(), color);
            for yy in r.y1..=r.y2 {
                self.state.touch(r.x1, r.x2, yy);
            }
        }
    }

    fn emit_covers(&mut self, x: i32, y: i32) {
        let Some(surface) = self.surface.as_mut() else {
            return;
        };
        if emit_row(
            surface,
            &self.state,
            &mut self.scratch,
            &self.gamma,
            self.routine,
            self.paint_mode,
            x,
            y,
            &self.covers,
        ) {
            self.state.touch(x, x + self.covers.len() as i32 - 1, y);
        }
    }
}

/// Generate paint and mask inputs for a covered run and composite it.
/// Returns `false` when nothing was written.
#[allow(clippy::too_many_arguments)]
fn emit_row(
    surface: &mut Surface<'_>,
    state: &RendererState,
    scratch: &mut RowScratch,
    gamma: &LcdGamma,
    routine: BlendRoutine,
    mode: PaintMode,
    x: i32,
    y: i32,
    covers: &[u8],
) -> bool {
    let n = covers.len();
    if n == 0 {
        return false;
    }

    let mut color = state.paint.color_pre();
    if routine.uses_paint() {
        scratch.paint.resize(n, 0);
        let src = PaintSource::new(mode, &state.paint, &state.gradients, &state.textures);
        src.generate(&mut scratch.paint[..n], x, y);
    } else if let Some(c) = PaintSource::new(mode, &state.paint, &state.gradients, &state.textures)
        .flat_color()
    {
        color = c;
    }

    match (routine.mask_channel(), state.mask.mask.as_ref()) {
        (MaskChannel::Alpha, Some(m)) => {
            scratch.mask.resize(n, 0);
            m.alpha_row(x, y, &mut scratch.mask[..n]);
        }
        (MaskChannel::Lcd, Some(m)) => {
            scratch.lcd.resize(n, [0; 3]);
            m.lcd_row(x, y, &mut scratch.lcd[..n]);
        }
        _ => {}
    }

    let Some(row) = surface.row_mut(x, y, n) else {
        trace!("row {y}: span {x}+{n} outside surface");
        return false;
    };
    let span = BlendSpan {
        covers,
        mask: scratch.mask.get(..n).unwrap_or(&[]),
        lcd: scratch.lcd.get(..n).unwrap_or(&[]),
        paint: scratch.paint.get(..n).unwrap_or(&[]),
        color,
    };
    blend_row(routine, row, &span, gamma);
    true
}

/// 16.16 fixed-point value of a coordinate already inside the clip box.
#[inline]
fn to_frac(v: f64) -> i64 {
    (v * FIXED_ONE as f64).round() as i64
}

/// Coverage byte for horizontal and vertical 16.16 fractions.
#[inline]
fn fixed_cover(h: i64, v: i64) -> u8 {
    let area = (h.clamp(0, FIXED_ONE as i64) * v.clamp(0, FIXED_ONE as i64)) >> FIXED_SHIFT;
    ((area * COVER_FULL as i64 + (FIXED_ONE as i64 / 2)) >> FIXED_SHIFT) as u8
}

// ============================================================================
// Tests
// ============================================================================
