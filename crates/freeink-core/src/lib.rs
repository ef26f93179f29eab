//! freeink Core Library
//!
//! Platform-agnostic stroke capture, history and document model for the
//! freeink drawing engine. Pixels live behind the [`surface::Surface`]
//! trait; `freeink-render` provides the CPU raster implementation.

pub mod color;
pub mod document;
pub mod engine;
pub mod history;
pub mod input;
pub mod point_buffer;
pub mod simplify;
pub mod stroke;
pub mod surface;

pub use color::Color;
pub use document::{DOCUMENT_VERSION, DocumentError, DrawingDocument, StrokeRecord};
pub use engine::{Engine, EngineConfig, FrameMetrics, Tool};
pub use history::{History, RasterSnapshot, SnapshotRing};
pub use input::{MouseButton, PointerEvent};
pub use point_buffer::PointBuffer;
pub use simplify::simplify_points;
pub use stroke::{CompositeMode, Stroke, StrokeId};
pub use surface::{BoxFuture, Surface, SurfaceError, SurfaceResult};
