//! PNG encoding for raster surfaces.

use freeink_core::surface::{SurfaceError, SurfaceResult};

/// Encode tightly packed RGBA8 pixels as PNG.
///
/// PNG is lossless; `quality` in `[0, 1]` selects compression effort
/// rather than fidelity.
pub(crate) fn encode_rgba(
    width: u32,
    height: u32,
    rgba: &[u8],
    quality: f64,
) -> SurfaceResult<Vec<u8>> {
    let mut out = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut out, width, height);
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        encoder.set_compression(compression_for(quality));
        let mut writer = encoder
            .write_header()
            .map_err(|e| SurfaceError::Encoding(e.to_string()))?;
        writer
            .write_image_data(rgba)
            .map_err(|e| SurfaceError::Encoding(e.to_string()))?;
    }
    Ok(out)
}

fn compression_for(quality: f64) -> png::Compression {
    if quality < 0.34 {
        png::Compression::Fast
    } else if quality < 0.67 {
        png::Compression::Default
    } else {
        png::Compression::Best
    }
}
