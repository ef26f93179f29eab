//! Rendering surface abstraction.

use crate::color::Color;
use crate::stroke::Stroke;
use kurbo::Size;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Surface errors.
#[derive(Debug, Error)]
pub enum SurfaceError {
    #[error("Surface unavailable: {0}")]
    Unavailable(String),
    #[error("Encoding failed: {0}")]
    Encoding(String),
}

/// Result type for surface operations.
pub type SurfaceResult<T> = Result<T, SurfaceError>;

/// Boxed future for async-from-the-caller operations (raster export).
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// A pixel-addressable 2D drawing surface.
///
/// Implementations own a backing buffer sized `logical × device pixel
/// ratio` and apply the ratio as a uniform scale, so every coordinate
/// handed to this trait stays in logical (CSS-like) pixel space.
///
/// Drawing a stroke means: round caps and joins, the stroke's composite
/// mode (paint-over or erase-as-subtract), and the dot case — fewer than
/// two vertices renders as a filled circle of diameter `stroke.size`.
pub trait Surface {
    /// Full-raster capture used by the history manager to bound undo cost.
    type Snapshot;

    /// Logical size of the drawable area.
    fn logical_size(&self) -> Size;

    /// Scale factor between logical coordinates and backing pixels.
    fn device_pixel_ratio(&self) -> f64;

    /// Resize the backing buffer to a new logical size.
    ///
    /// Pixel contents are lost; the caller is responsible for a full
    /// redraw afterwards.
    fn resize(&mut self, logical: Size);

    /// Clear everything and fill with the background color.
    fn clear(&mut self, background: Color);

    /// Draw one whole stroke (polyline or dot).
    fn draw_stroke(&mut self, stroke: &Stroke);

    /// Draw only the segments from `from_vertex - 1` onward.
    ///
    /// This is the incremental path: per-frame cost is bounded by newly
    /// appended input, not total stroke length. Returns the number of
    /// segments drawn.
    fn draw_stroke_tail(&mut self, stroke: &Stroke, from_vertex: usize) -> usize;

    /// Clear, fill background, and draw every stroke in order.
    fn full_redraw(&mut self, background: Color, strokes: &[Stroke]) {
        self.clear(background);
        for stroke in strokes {
            self.draw_stroke(stroke);
        }
    }

    /// Capture the current raster contents.
    fn snapshot(&self) -> Self::Snapshot;

    /// Blit a previously captured raster back onto the surface.
    fn restore(&mut self, snapshot: &Self::Snapshot);

    /// Encode the current contents as PNG at a quality in `[0, 1]`.
    fn encode_png(&self, quality: f64) -> SurfaceResult<Vec<u8>>;
}
