//! # swpaint
//!
//! Software scanline rasterizer and compositor. Callers hand over, one row
//! at a time, the signed x positions where path edges cross that row; the
//! renderer turns them into 8-bit coverage, paints the covered run with a
//! flat color, a linear or radial gradient, or a transformed texture, and
//! composites it into a caller-owned pixel buffer.
//!
//! ## Pipeline
//!
//! 1. **Coverage**: [`coverage::CoverageAccumulator`] resolves crossings
//!    under a fill rule into per-pixel coverage, with 8×8 sub-sampling when
//!    anti-aliasing is on.
//! 2. **Paint**: [`paint::PaintSource`] fills a span buffer with
//!    premultiplied colors from the active paint.
//! 3. **Blend**: [`blend::BlendRoutine`] composites paint, coverage and an
//!    optional alpha or LCD [`mask::Mask`] into a [`surface::Surface`] row
//!    using Clear, Src or SrcOver.
//!
//! [`renderer::Renderer`] owns the configuration, picks the blend routine
//! whenever it changes and tracks the bounding box of written pixels.
//!
//! Diagnostics go through the [`log`] facade: degenerate configuration is
//! reported at `debug`, skipped rows and dropped crossings at `trace`.

// Foundation
pub mod basics;
pub mod color;
pub mod trans_affine;

// Destination and sources
pub mod gradient;
pub mod mask;
pub mod surface;
pub mod texture;

// Pipeline
pub mod blend;
pub mod coverage;
pub mod paint;
pub mod renderer;

pub use basics::{FillRule, RectI};
pub use blend::{BlendRoutine, CompositeRule};
pub use color::Rgba8;
pub use coverage::{Crossing, ScanlineEdges};
pub use gradient::{CycleMethod, GradientColorMap, GradientStop};
pub use mask::{Mask, MaskError};
pub use paint::{PaintMode, SpanGenerator};
pub use renderer::{Renderer, RendererOptions};
pub use surface::{PixelFormat, Surface, SurfaceError};
pub use texture::{EdgePolicy, TextureEdges, TextureError, TextureSource};
pub use trans_affine::TransAffine;
