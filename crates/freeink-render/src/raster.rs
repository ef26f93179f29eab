//! CPU raster surface: capsule stroke rasterization with DPR scaling.

use crate::encode;
use crate::pixmap::Pixmap;
use freeink_core::color::Color;
use freeink_core::stroke::{CompositeMode, Stroke, point_to_segment_dist};
use freeink_core::surface::{Surface, SurfaceError, SurfaceResult};
use kurbo::{Point, Size};

/// A CPU-backed drawing surface.
///
/// The backing pixmap is sized `logical × device pixel ratio`; every
/// coordinate arriving through the [`Surface`] trait is in logical pixels
/// and scaled here. Strokes are rasterized as one capsule (a segment
/// dilated by half the line width) per polyline segment, which yields
/// round caps and round joins; dots are the degenerate zero-length
/// capsule. Edge pixels get linear coverage over a one-pixel feather.
pub struct RasterSurface {
    logical: Size,
    dpr: f64,
    pixmap: Pixmap,
}

impl RasterSurface {
    /// Create a surface for a logical area at the given pixel ratio.
    pub fn new(logical: Size, device_pixel_ratio: f64) -> Self {
        let dpr = if device_pixel_ratio > 0.0 {
            device_pixel_ratio
        } else {
            1.0
        };
        let (width, height) = backing_size(logical, dpr);
        Self {
            logical,
            dpr,
            pixmap: Pixmap::new(width, height),
        }
    }

    /// Direct access to the backing pixels.
    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }

    fn device(&self, point: Point) -> Point {
        Point::new(point.x * self.dpr, point.y * self.dpr)
    }

    /// Rasterize the capsule around segment a→b (device coordinates).
    fn draw_capsule(
        &mut self,
        a: Point,
        b: Point,
        half_width: f64,
        color: [f32; 4],
        composite: CompositeMode,
    ) {
        let reach = half_width + 1.0;
        let x0 = (a.x.min(b.x) - reach).floor().max(0.0) as u32;
        let y0 = (a.y.min(b.y) - reach).floor().max(0.0) as u32;
        let x1 = ((a.x.max(b.x) + reach).ceil()).min(f64::from(self.pixmap.width())) as u32;
        let y1 = ((a.y.max(b.y) + reach).ceil()).min(f64::from(self.pixmap.height())) as u32;

        for y in y0..y1 {
            for x in x0..x1 {
                let center = Point::new(f64::from(x) + 0.5, f64::from(y) + 0.5);
                let dist = point_to_segment_dist(center, a, b);
                let coverage = (half_width + 0.5 - dist).clamp(0.0, 1.0) as f32;
                if coverage <= 0.0 {
                    continue;
                }
                match composite {
                    CompositeMode::Normal => self.pixmap.blend(x, y, color, coverage),
                    CompositeMode::Erase => self.pixmap.erase(x, y, coverage * color[3]),
                }
            }
        }
    }
}

fn backing_size(logical: Size, dpr: f64) -> (u32, u32) {
    let width = (logical.width * dpr).floor().max(0.0) as u32;
    let height = (logical.height * dpr).floor().max(0.0) as u32;
    (width, height)
}

impl Surface for RasterSurface {
    type Snapshot = Pixmap;

    fn logical_size(&self) -> Size {
        self.logical
    }

    fn device_pixel_ratio(&self) -> f64 {
        self.dpr
    }

    fn resize(&mut self, logical: Size) {
        self.logical = logical;
        let (width, height) = backing_size(logical, self.dpr);
        self.pixmap = Pixmap::new(width, height);
    }

    fn clear(&mut self, background: Color) {
        self.pixmap.fill(background.to_f32_array());
    }

    fn draw_stroke(&mut self, stroke: &Stroke) {
        if stroke.is_dot() {
            let Some(center) = stroke.points.point(0) else {
                return;
            };
            let center = self.device(center);
            let half_width = (stroke.size / 2.0) * self.dpr;
            self.draw_capsule(
                center,
                center,
                half_width,
                stroke.color.to_f32_array(),
                stroke.composite,
            );
            return;
        }
        self.draw_stroke_tail(stroke, 1);
    }

    fn draw_stroke_tail(&mut self, stroke: &Stroke, from_vertex: usize) -> usize {
        let total = stroke.points.vertex_count();
        let from = from_vertex.max(1);
        if total < 2 || from >= total {
            return 0;
        }
        let color = stroke.color.to_f32_array();
        let half_width = (stroke.size / 2.0) * self.dpr;
        for i in from..total {
            let (Some(a), Some(b)) = (stroke.points.point(i - 1), stroke.points.point(i)) else {
                break;
            };
            let a = self.device(a);
            let b = self.device(b);
            self.draw_capsule(a, b, half_width, color, stroke.composite);
        }
        total - from
    }

    fn snapshot(&self) -> Pixmap {
        self.pixmap.clone()
    }

    fn restore(&mut self, snapshot: &Pixmap) {
        if snapshot.width() != self.pixmap.width() || snapshot.height() != self.pixmap.height() {
            log::warn!(
                "discarding snapshot blit: {}x{} onto {}x{}",
                snapshot.width(),
                snapshot.height(),
                self.pixmap.width(),
                self.pixmap.height()
            );
            return;
        }
        self.pixmap = snapshot.clone();
    }

    fn encode_png(&self, quality: f64) -> SurfaceResult<Vec<u8>> {
        let (width, height) = (self.pixmap.width(), self.pixmap.height());
        if width == 0 || height == 0 {
            return Err(SurfaceError::Unavailable(format!(
                "surface has zero pixel area ({width}x{height})"
            )));
        }
        encode::encode_rgba(width, height, &self.pixmap.to_rgba8(), quality)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use freeink_core::engine::{Engine, EngineConfig};
    use freeink_core::input::MouseButton;
    use freeink_core::surface::BoxFuture;
    use std::future::Future;
    use std::task::{Context, Poll, Waker};

    fn surface() -> RasterSurface {
        RasterSurface::new(Size::new(64.0, 64.0), 1.0)
    }

    fn stroke_with(points: &[(f64, f64)], size: f64, composite: CompositeMode) -> Stroke {
        let mut stroke = Stroke::new(
            Color::black(),
            size,
            composite,
            Point::new(points[0].0, points[0].1),
        );
        for &(x, y) in &points[1..] {
            stroke.points.push(Point::new(x, y));
        }
        stroke
    }

    fn alpha_at(surface: &RasterSurface, x: u32, y: u32) -> f32 {
        surface.pixmap().pixel(x, y).unwrap()[3]
    }

    fn is_dark(surface: &RasterSurface, x: u32, y: u32) -> bool {
        surface.pixmap().pixel(x, y).unwrap()[0] < 0.5
    }

    fn block_on_ready<T>(mut future: BoxFuture<'static, T>) -> T {
        let mut cx = Context::from_waker(Waker::noop());
        match future.as_mut().poll(&mut cx) {
            Poll::Ready(value) => value,
            Poll::Pending => panic!("export future should resolve immediately"),
        }
    }

    #[test]
    fn test_backing_size_follows_dpr() {
        let surface = RasterSurface::new(Size::new(100.0, 50.0), 2.0);
        assert_eq!(surface.pixmap().width(), 200);
        assert_eq!(surface.pixmap().height(), 100);
        assert_eq!(surface.logical_size(), Size::new(100.0, 50.0));
    }

    #[test]
    fn test_dot_renders_filled_circle() {
        let mut surface = surface();
        surface.clear(Color::white());
        let dot = stroke_with(&[(20.0, 20.0)], 10.0, CompositeMode::Normal);
        surface.draw_stroke(&dot);

        // Center is solidly inked.
        assert!(is_dark(&surface, 20, 20));
        // Within the 5px radius in every direction.
        assert!(is_dark(&surface, 24, 20));
        assert!(is_dark(&surface, 20, 16));
        // Beyond the radius stays background.
        assert!(!is_dark(&surface, 27, 20));
        assert!(!is_dark(&surface, 20, 28));
    }

    #[test]
    fn test_polyline_covers_its_path_only() {
        let mut surface = surface();
        surface.clear(Color::white());
        let stroke = stroke_with(&[(5.0, 10.0), (40.0, 10.0)], 4.0, CompositeMode::Normal);
        surface.draw_stroke(&stroke);

        assert!(is_dark(&surface, 20, 10));
        assert!(is_dark(&surface, 39, 10));
        // Round cap extends slightly past the endpoint.
        assert!(is_dark(&surface, 41, 10));
        // Far from the path: untouched.
        assert!(!is_dark(&surface, 20, 30));
        assert!(!is_dark(&surface, 50, 10));
    }

    #[test]
    fn test_erase_subtracts_alpha() {
        let mut surface = surface();
        surface.clear(Color::white());
        assert!((alpha_at(&surface, 20, 10) - 1.0).abs() < 0.001);

        let eraser = stroke_with(&[(5.0, 10.0), (40.0, 10.0)], 6.0, CompositeMode::Erase);
        surface.draw_stroke(&eraser);

        assert!(alpha_at(&surface, 20, 10) < 0.05);
        // Outside the eraser path the background survives.
        assert!((alpha_at(&surface, 20, 30) - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_dpr_scales_device_geometry() {
        let mut surface = RasterSurface::new(Size::new(32.0, 32.0), 2.0);
        surface.clear(Color::white());
        let dot = stroke_with(&[(10.0, 10.0)], 6.0, CompositeMode::Normal);
        surface.draw_stroke(&dot);

        // Logical (10,10) lands at device (20,20) with a 6-device-pixel
        // radius.
        assert!(is_dark(&surface, 20, 20));
        assert!(is_dark(&surface, 25, 20));
        assert!(!is_dark(&surface, 27, 20));
    }

    #[test]
    fn test_snapshot_restore_round_trip() {
        let mut surface = surface();
        surface.clear(Color::white());
        surface.draw_stroke(&stroke_with(
            &[(5.0, 5.0), (30.0, 30.0)],
            4.0,
            CompositeMode::Normal,
        ));
        let snapshot = surface.snapshot();

        surface.draw_stroke(&stroke_with(
            &[(5.0, 30.0), (30.0, 5.0)],
            4.0,
            CompositeMode::Normal,
        ));
        assert_ne!(*surface.pixmap(), snapshot);

        surface.restore(&snapshot);
        assert_eq!(*surface.pixmap(), snapshot);
    }

    #[test]
    fn test_restore_dimension_mismatch_is_dropped() {
        let mut surface = surface();
        surface.clear(Color::white());
        let snapshot = surface.snapshot();

        surface.resize(Size::new(32.0, 32.0));
        surface.clear(Color::black());
        surface.restore(&snapshot);

        // The stale snapshot was ignored.
        assert_eq!(surface.pixmap().width(), 32);
        assert!(is_dark(&surface, 10, 10));
    }

    #[test]
    fn test_off_surface_strokes_do_not_panic() {
        let mut surface = surface();
        surface.clear(Color::white());
        surface.draw_stroke(&stroke_with(
            &[(-50.0, -50.0), (-10.0, -10.0)],
            8.0,
            CompositeMode::Normal,
        ));
        surface.draw_stroke(&stroke_with(
            &[(100.0, 100.0), (200.0, 200.0)],
            8.0,
            CompositeMode::Normal,
        ));
        assert!(!is_dark(&surface, 32, 32));
    }

    #[test]
    fn test_zero_size_export_fails() {
        let surface = RasterSurface::new(Size::ZERO, 1.0);
        assert!(matches!(
            surface.encode_png(1.0),
            Err(SurfaceError::Unavailable(_))
        ));
    }

    // Engine-level integration: the raster surface driven through the
    // full pointer → frame → history pipeline.

    fn engine() -> Engine<RasterSurface> {
        let _ = env_logger::builder().is_test(true).try_init();
        Engine::new(
            RasterSurface::new(Size::new(64.0, 64.0), 1.0),
            EngineConfig {
                simplify: false,
                ..EngineConfig::default()
            },
        )
    }

    fn draw_line(engine: &mut Engine<RasterSurface>, from: (f64, f64), to: (f64, f64)) {
        engine.pointer_down(Point::new(from.0, from.1), MouseButton::Left);
        let steps = 4;
        for i in 1..=steps {
            let t = f64::from(i) / f64::from(steps);
            engine.pointer_move(Point::new(
                from.0 + (to.0 - from.0) * t,
                from.1 + (to.1 - from.1) * t,
            ));
            if engine.needs_frame() {
                engine.on_frame();
            }
        }
        engine.pointer_up();
    }

    fn redraw_reference(engine: &Engine<RasterSurface>) -> RasterSurface {
        let mut reference = RasterSurface::new(engine.surface().logical_size(), 1.0);
        reference.full_redraw(Color::white(), engine.strokes());
        reference
    }

    #[test]
    fn test_incremental_equals_full_redraw() {
        let mut engine = engine();
        draw_line(&mut engine, (5.0, 5.0), (50.0, 20.0));
        draw_line(&mut engine, (10.0, 40.0), (60.0, 40.0));

        let reference = redraw_reference(&engine);
        assert_eq!(*engine.surface().pixmap(), *reference.pixmap());
    }

    #[test]
    fn test_undo_is_pixel_equivalent_to_redraw() {
        let mut engine = engine();
        for i in 0..10 {
            let y = 4.0 + f64::from(i) * 5.0;
            draw_line(&mut engine, (4.0, y), (60.0, y));
        }

        // One undo: restores from the count-8 snapshot and replays stroke 9.
        engine.undo();
        assert_eq!(engine.strokes().len(), 9);
        let reference = redraw_reference(&engine);
        assert_eq!(*engine.surface().pixmap(), *reference.pixmap());

        // Two more: falls below every snapshot and replays from scratch.
        engine.undo();
        engine.undo();
        assert_eq!(engine.strokes().len(), 7);
        let reference = redraw_reference(&engine);
        assert_eq!(*engine.surface().pixmap(), *reference.pixmap());
    }

    #[test]
    fn test_redo_is_pixel_equivalent_to_redraw() {
        let mut engine = engine();
        for i in 0..5 {
            let y = 8.0 + f64::from(i) * 10.0;
            draw_line(&mut engine, (4.0, y), (60.0, y));
        }
        engine.undo();
        engine.undo();
        engine.redo();

        assert_eq!(engine.strokes().len(), 4);
        let reference = redraw_reference(&engine);
        assert_eq!(*engine.surface().pixmap(), *reference.pixmap());
    }

    #[test]
    fn test_import_export_pixel_equivalence() {
        let mut engine = engine();
        draw_line(&mut engine, (5.0, 5.0), (50.0, 50.0));
        draw_line(&mut engine, (50.0, 5.0), (5.0, 50.0));
        let json = engine.export_json().unwrap();

        let mut other = self::engine();
        draw_line(&mut other, (30.0, 30.0), (40.0, 10.0));
        other.import_json(&json).unwrap();

        assert_eq!(other.strokes().len(), 2);
        let reference = redraw_reference(&engine);
        assert_eq!(*other.surface().pixmap(), *reference.pixmap());
    }

    #[test]
    fn test_erase_then_undo_restores_ink() {
        let mut engine = engine();
        draw_line(&mut engine, (5.0, 20.0), (60.0, 20.0));
        let before = engine.surface().pixmap().clone();

        engine.set_tool(freeink_core::engine::Tool::Eraser);
        draw_line(&mut engine, (20.0, 5.0), (20.0, 40.0));
        assert_ne!(*engine.surface().pixmap(), before);

        engine.undo();
        assert_eq!(*engine.surface().pixmap(), before);
    }

    #[test]
    fn test_engine_png_export() {
        let mut engine = engine();
        draw_line(&mut engine, (5.0, 5.0), (50.0, 50.0));
        let bytes = block_on_ready(engine.export_png(0.9)).unwrap();
        assert_eq!(&bytes[0..4], &[0x89, 0x50, 0x4E, 0x47]);
    }
}
