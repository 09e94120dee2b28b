//! Row throughput for the main paint and blend combinations.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use swpaint::{
    CompositeRule, Crossing, CycleMethod, FillRule, GradientStop, Mask, PaintMode, Renderer,
    RendererOptions, Rgba8, ScanlineEdges, Surface, TextureSource, TransAffine,
};

const W: u32 = 512;
const H: u32 = 64;

// ============================================================================
// Fixtures
// ============================================================================

/// A slanted shape: eight sub-rows whose edges drift by a fraction per row.
fn slanted_edges(y: i32) -> ScanlineEdges {
    let mut edges = ScanlineEdges::new();
    for s in 0..8 {
        let off = (y as f64 + s as f64 / 8.0) * 0.37;
        edges.push_row(&[
            Crossing::new(10.3 + off, 1),
            Crossing::new(W as f64 - 10.7 - off, -1),
        ]);
    }
    edges
}

fn configure(r: &mut Renderer<'_>, mode: PaintMode) {
    let stops = [
        GradientStop::new(0.0, Rgba8::new_opaque(255, 0, 0)),
        GradientStop::new(0.5, Rgba8::new(0, 255, 0, 160)),
        GradientStop::new(1.0, Rgba8::new_opaque(0, 0, 255)),
    ];
    r.set_color(Rgba8::new(40, 80, 200, 220));
    r.set_linear_gradient(
        (0.0, 0.0),
        (W as f64, H as f64),
        &stops,
        CycleMethod::Reflect,
        &TransAffine::IDENTITY,
    );
    r.set_radial_gradient(
        (W as f64 / 2.0, H as f64 / 2.0),
        (W as f64 / 3.0, H as f64 / 2.0),
        W as f64 / 2.0,
        &stops,
        CycleMethod::Repeat,
        &TransAffine::IDENTITY,
    );
    let texels: Vec<u32> = (0..64u32 * 64)
        .map(|i| 0xFF00_0000 | (i.wrapping_mul(2_654_435_761) >> 8))
        .collect();
    if let Ok(mut tex) = TextureSource::from_argb(texels, 64, 64, 64, false) {
        tex.set_repeat(true)
            .set_interpolate(true)
            .set_transform(&TransAffine::new_rotation(0.3));
        r.set_texture(tex);
    }
    r.configure(mode, CompositeRule::SrcOver, true);
}

// ============================================================================
// Benchmarks
// ============================================================================

fn bench_paint_modes(c: &mut Criterion) {
    let mut group = c.benchmark_group("render_row");
    group.throughput(Throughput::Elements((W * H) as u64));
    let rows: Vec<ScanlineEdges> = (0..H as i32).map(slanted_edges).collect();

    for mode in [
        PaintMode::Flat,
        PaintMode::LinearGradient,
        PaintMode::RadialGradient,
        PaintMode::Texture,
    ] {
        let mut buf = vec![0xFF20_2020u32; (W * H) as usize];
        let surface = Surface::new_argb(&mut buf, W, H).unwrap();
        let mut r = Renderer::with_surface(surface, RendererOptions::default());
        configure(&mut r, mode);
        let id = BenchmarkId::new("src_over", format!("{mode:?}"));
        group.bench_with_input(id, &rows, |b, rows| {
            b.iter(|| {
                for (y, e) in rows.iter().enumerate() {
                    r.render_row(black_box(y as i32), e, FillRule::NonZero);
                }
            })
        });
    }
    group.finish();
}

fn bench_masks(c: &mut Criterion) {
    let mut group = c.benchmark_group("fill_mask");
    group.throughput(Throughput::Elements((W * H) as u64));

    let alpha: Vec<u8> = (0..W * H).map(|i| (i * 7) as u8).collect();
    let lcd: Vec<u8> = (0..W * H * 3).map(|i| (i * 13) as u8).collect();
    let masks = [
        ("alpha", Mask::alpha(alpha, 0, 0, W, H, W as usize).unwrap()),
        ("lcd", Mask::lcd(lcd, 0, 0, W, H, (W * 3) as usize, 0).unwrap()),
    ];

    for (name, mask) in masks {
        let mut buf = vec![0xFFFF_FFFFu32; (W * H) as usize];
        let surface = Surface::new_argb(&mut buf, W, H).unwrap();
        let mut r = Renderer::with_surface(surface, RendererOptions::default());
        r.set_color(Rgba8::new_opaque(10, 20, 30));
        r.set_mask(Some(mask));
        group.bench_function(name, |b| b.iter(|| r.fill_mask()));
    }
    group.finish();
}

criterion_group!(benches, bench_paint_modes, bench_masks);
criterion_main!(benches);
