//! freeink Render Library
//!
//! CPU raster implementation of the freeink surface abstraction: an
//! RGBA pixmap with source-over and destination-out compositing, capsule
//! stroke rasterization, and PNG export.

mod encode;
mod pixmap;
mod raster;

pub use pixmap::Pixmap;
pub use raster::RasterSurface;
