//! Drawing engine façade: pointer handling, incremental painting and
//! history commands.

use crate::color::Color;
use crate::document::{DocumentError, DrawingDocument};
use crate::history::{DEFAULT_MAX_SNAPSHOTS, DEFAULT_SNAPSHOT_INTERVAL, History};
use crate::input::{MouseButton, PointerEvent};
use crate::point_buffer::PointBuffer;
use crate::simplify::{MIN_SIMPLIFY_VERTICES, simplify_points};
use crate::stroke::{CompositeMode, Stroke};
use crate::surface::{BoxFuture, Surface, SurfaceResult};
use kurbo::{Point, Size};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Active drawing tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Tool {
    #[default]
    Pen,
    Eraser,
}

/// Engine tuning knobs.
///
/// The device pixel ratio is a property of the surface, not of the
/// engine; construct the surface with the ratio you need.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Capture a raster snapshot every N commits.
    pub snapshot_interval: usize,
    /// Snapshot ring capacity.
    pub max_snapshots: usize,
    pub background_color: Color,
    /// Keep taps as dots instead of discarding them.
    pub keep_single_point_strokes: bool,
    /// Run Ramer-Douglas-Peucker on finished pen strokes.
    pub simplify: bool,
    /// Simplification tolerance in logical pixels.
    pub simplify_tolerance: f64,
    /// Hard cap on vertices per stroke; appends beyond it are ignored.
    pub max_points_per_stroke: Option<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            snapshot_interval: DEFAULT_SNAPSHOT_INTERVAL,
            max_snapshots: DEFAULT_MAX_SNAPSHOTS,
            background_color: Color::white(),
            keep_single_point_strokes: true,
            simplify: true,
            simplify_tolerance: 0.6,
            max_points_per_stroke: None,
        }
    }
}

/// Single-flight paint scheduler.
///
/// `request` is idempotent: however many vertices arrive between frames,
/// at most one paint is pending. The flag clears only when the frame
/// callback runs.
#[derive(Debug, Default)]
struct FrameScheduler {
    pending: bool,
}

impl FrameScheduler {
    fn request(&mut self) {
        self.pending = true;
    }

    fn acknowledge(&mut self) {
        self.pending = false;
    }

    fn is_pending(&self) -> bool {
        self.pending
    }
}

/// Paint-loop counters.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameMetrics {
    pub frame_count: u64,
    pub total_segments_drawn: u64,
    pub last_frame_segments: usize,
    pub last_frame_duration: Duration,
    pub max_frame_duration: Duration,
}

/// The in-progress stroke plus how much of it is already on the surface.
#[derive(Debug)]
struct ActiveStroke {
    stroke: Stroke,
    /// Vertices already painted by the incremental path.
    drawn_vertices: usize,
}

/// The drawing engine.
///
/// Owns the surface, the in-progress stroke and all history state; no
/// other component mutates them. Callers feed pointer events, invoke
/// [`on_frame`](Self::on_frame) on their platform's repaint callback
/// whenever [`needs_frame`](Self::needs_frame) reports true, and issue
/// commands (undo/redo/clear/import/export).
pub struct Engine<S: Surface> {
    surface: S,
    config: EngineConfig,
    history: History<S::Snapshot>,
    active: Option<ActiveStroke>,
    scheduler: FrameScheduler,
    metrics: FrameMetrics,
    color: Color,
    size: f64,
    tool: Tool,
}

impl<S: Surface> Engine<S> {
    /// Create an engine over a surface and paint the background.
    pub fn new(surface: S, config: EngineConfig) -> Self {
        let mut engine = Self {
            history: History::new(config.snapshot_interval, config.max_snapshots),
            surface,
            config,
            active: None,
            scheduler: FrameScheduler::default(),
            metrics: FrameMetrics::default(),
            color: Color::black(),
            size: 4.0,
            tool: Tool::Pen,
        };
        engine.surface.clear(engine.config.background_color);
        engine
    }

    /// Dispatch a pointer event.
    pub fn handle_event(&mut self, event: PointerEvent) {
        match event {
            PointerEvent::Down { position, button } => self.pointer_down(position, button),
            PointerEvent::Move { position } => self.pointer_move(position),
            PointerEvent::Up { .. } => self.pointer_up(),
        }
    }

    /// Begin a stroke at `position`. Non-primary buttons are ignored.
    pub fn pointer_down(&mut self, position: Point, button: MouseButton) {
        if button != MouseButton::Left {
            return;
        }
        if self.active.is_some() {
            // Missed pointer-up; finalize before starting over.
            self.end_stroke();
        }
        let composite = match self.tool {
            Tool::Pen => CompositeMode::Normal,
            Tool::Eraser => CompositeMode::Erase,
        };
        let stroke = Stroke::new(self.color, self.size, composite, position);
        self.active = Some(ActiveStroke {
            stroke,
            drawn_vertices: 0,
        });
    }

    /// Append a vertex to the in-progress stroke and request a paint.
    pub fn pointer_move(&mut self, position: Point) {
        let Some(active) = self.active.as_mut() else {
            return;
        };
        if let Some(cap) = self.config.max_points_per_stroke {
            if active.stroke.points.vertex_count() >= cap {
                return;
            }
        }
        active.stroke.points.push(position);
        self.scheduler.request();
    }

    /// Finish the in-progress stroke and commit it to history.
    pub fn pointer_up(&mut self) {
        self.end_stroke();
    }

    /// Whether a paint request is pending.
    ///
    /// The caller's repaint loop should invoke [`on_frame`](Self::on_frame)
    /// on the next display refresh when this is true.
    pub fn needs_frame(&self) -> bool {
        self.scheduler.is_pending()
    }

    /// Paint the segments appended since the previous frame.
    pub fn on_frame(&mut self) {
        self.scheduler.acknowledge();
        let Some(active) = self.active.as_mut() else {
            return;
        };
        // Two vertices are needed before any segment exists.
        if active.stroke.points.len() < 4 {
            return;
        }
        let total = active.stroke.points.vertex_count();
        let from = active.drawn_vertices.max(1);
        if from >= total {
            return;
        }

        let started = Instant::now();
        let segments = self.surface.draw_stroke_tail(&active.stroke, from);
        active.drawn_vertices = total;

        let elapsed = started.elapsed();
        self.metrics.frame_count += 1;
        self.metrics.total_segments_drawn += segments as u64;
        self.metrics.last_frame_segments = segments;
        self.metrics.last_frame_duration = elapsed;
        if elapsed > self.metrics.max_frame_duration {
            self.metrics.max_frame_duration = elapsed;
        }
    }

    /// Finalize the in-progress stroke, if any.
    pub fn flush(&mut self) {
        self.end_stroke();
    }

    fn end_stroke(&mut self) {
        let Some(mut active) = self.active.take() else {
            return;
        };

        if active.stroke.points.len() < 4 && !self.config.keep_single_point_strokes {
            return;
        }

        // Paint whatever the incremental path has not covered yet, before
        // simplification can change the geometry.
        if active.stroke.points.len() >= 4 {
            let total = active.stroke.points.vertex_count();
            let from = active.drawn_vertices.max(1);
            if from < total {
                self.surface.draw_stroke_tail(&active.stroke, from);
            }
        }

        let mut stroke = active.stroke;
        stroke.points.trim();

        if self.config.simplify
            && stroke.composite != CompositeMode::Erase
            && stroke.points.vertex_count() >= MIN_SIMPLIFY_VERTICES
        {
            if let Some(reduced) =
                simplify_points(stroke.points.as_slice(), self.config.simplify_tolerance)
            {
                stroke.original_len = Some(stroke.points.len());
                stroke.points = PointBuffer::from_floats(reduced);
            }
        }

        // The incremental path never draws single-vertex strokes; dots
        // are painted here instead.
        if stroke.is_dot() {
            self.surface.draw_stroke(&stroke);
        }

        log::debug!(
            "commit stroke {} ({} vertices)",
            stroke.id,
            stroke.points.vertex_count()
        );
        let snapshot_due = self.history.commit(stroke);
        if snapshot_due {
            let raster = self.surface.snapshot();
            self.history.record_snapshot(raster);
        }
    }

    /// Undo the newest committed stroke.
    ///
    /// An in-progress stroke is flushed first; undo on empty history is a
    /// no-op.
    pub fn undo(&mut self) {
        if self.active.is_some() {
            self.end_stroke();
        }
        if !self.history.undo() {
            return;
        }
        log::debug!("undo to {} strokes", self.history.len());
        self.restore_committed();
    }

    /// Re-commit the most recently undone stroke.
    pub fn redo(&mut self) {
        if self.active.is_some() {
            self.end_stroke();
        }
        let Some(stroke) = self.history.redo() else {
            return;
        };
        // The surface already shows the prior committed state; drawing the
        // stroke directly is enough.
        self.surface.draw_stroke(stroke);
        log::debug!("redo to {} strokes", self.history.len());
    }

    /// Drop everything and repaint the background.
    pub fn clear(&mut self) {
        self.active = None;
        self.history.clear();
        self.surface.clear(self.config.background_color);
        log::debug!("cleared");
    }

    /// Repaint the committed drawing from scratch.
    pub fn full_redraw(&mut self) {
        self.surface
            .full_redraw(self.config.background_color, self.history.strokes());
    }

    /// Rebuild the surface for the current committed count: blit the
    /// newest usable snapshot and replay only the strokes after it.
    fn restore_committed(&mut self) {
        let count = self.history.len();
        self.surface.clear(self.config.background_color);
        if let Some(snapshot) = self.history.snapshot_at_or_below(count) {
            self.surface.restore(&snapshot.raster);
            for stroke in &self.history.strokes()[snapshot.stroke_count..count] {
                self.surface.draw_stroke(stroke);
            }
        } else {
            for stroke in &self.history.strokes()[..count] {
                self.surface.draw_stroke(stroke);
            }
        }
    }

    /// React to the drawable area changing size.
    ///
    /// The backing buffer's pixels are lost on resize, so everything
    /// committed is repainted and the incremental index caught up;
    /// in-progress stroke geometry is untouched. Snapshots captured at
    /// the old size can no longer be blitted and are dropped.
    pub fn handle_resize(&mut self, logical: Size) {
        if self.surface.logical_size() == logical {
            return;
        }
        self.surface.resize(logical);
        self.history.invalidate_snapshots();
        self.surface
            .full_redraw(self.config.background_color, self.history.strokes());
        if let Some(active) = self.active.as_mut() {
            if active.stroke.points.len() >= 4 {
                self.surface.draw_stroke(&active.stroke);
            }
            active.drawn_vertices = active.stroke.points.vertex_count();
        }
        log::debug!("resized to {}x{}", logical.width, logical.height);
    }

    /// Serialize the committed drawing (flushes first).
    pub fn export_document(&mut self) -> DrawingDocument {
        self.flush();
        DrawingDocument::from_strokes(
            self.history.strokes(),
            self.surface.device_pixel_ratio(),
            self.config.background_color,
        )
    }

    /// Serialize the committed drawing to JSON.
    pub fn export_json(&mut self) -> Result<String, DocumentError> {
        let json = self.export_document().to_json()?;
        Ok(json)
    }

    /// Replace the drawing with a parsed document.
    ///
    /// Redo and snapshot state are reset and the surface fully redrawn.
    pub fn import_document(&mut self, document: DrawingDocument) {
        let strokes = document.into_strokes();
        log::info!("importing {} strokes", strokes.len());
        self.active = None;
        self.history.replace(strokes);
        self.full_redraw();
    }

    /// Parse and import a JSON document.
    ///
    /// A malformed document is reported as an error and the current
    /// drawing is left unchanged.
    pub fn import_json(&mut self, json: &str) -> Result<(), DocumentError> {
        let document = DrawingDocument::from_json(json)?;
        self.import_document(document);
        Ok(())
    }

    /// Encode the surface as PNG (flushes first).
    ///
    /// Resolves asynchronously from the caller's perspective; no engine
    /// operation is gated on the result.
    pub fn export_png(&mut self, quality: f64) -> BoxFuture<'static, SurfaceResult<Vec<u8>>> {
        self.flush();
        let result = self.surface.encode_png(quality);
        Box::pin(std::future::ready(result))
    }

    /// Committed strokes, oldest first.
    ///
    /// This list changes only on commit, undo, redo, clear and import —
    /// never per vertex — so observers can treat it as a stable snapshot.
    pub fn strokes(&self) -> &[Stroke] {
        self.history.strokes()
    }

    pub fn is_drawing(&self) -> bool {
        self.active.is_some()
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn set_color(&mut self, color: Color) {
        self.color = color;
    }

    pub fn size(&self) -> f64 {
        self.size
    }

    pub fn set_size(&mut self, size: f64) {
        self.size = size;
    }

    pub fn tool(&self) -> Tool {
        self.tool
    }

    pub fn set_tool(&mut self, tool: Tool) {
        self.tool = tool;
    }

    pub fn metrics(&self) -> FrameMetrics {
        self.metrics
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Snapshot tags currently held, oldest first.
    pub fn snapshot_counts(&self) -> Vec<usize> {
        self.history.snapshot_counts()
    }
}
