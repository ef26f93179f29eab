//! Versioned drawing document serialization.

use crate::color::Color;
use crate::point_buffer::PointBuffer;
use crate::stroke::{CompositeMode, Stroke};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

/// Current document format version.
pub const DOCUMENT_VERSION: u32 = 1;

/// Document errors.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("Invalid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Document has no stroke list")]
    MissingStrokes,
}

/// One stroke in wire form.
///
/// `points` carries only the used portion of the stroke's buffer;
/// `length` repeats its float count so readers can validate, and
/// `originalLength` survives for diagnostics when simplification ran.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StrokeRecord {
    pub id: String,
    pub color: Color,
    pub size: f64,
    pub composite_mode: CompositeMode,
    pub points: Vec<f32>,
    pub length: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_length: Option<usize>,
}

impl StrokeRecord {
    /// Serialize a committed stroke.
    pub fn from_stroke(stroke: &Stroke) -> Self {
        Self {
            id: stroke.id.to_string(),
            color: stroke.color,
            size: stroke.size,
            composite_mode: stroke.composite,
            points: stroke.points.as_slice().to_vec(),
            length: stroke.points.len(),
            original_length: stroke.original_len,
        }
    }

    /// Extract a record from a JSON value, defaulting missing or invalid
    /// fields rather than rejecting the whole document.
    fn from_value(value: &serde_json::Value) -> Self {
        let id = match value.get("id") {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(serde_json::Value::Number(n)) => n.to_string(),
            _ => Uuid::new_v4().to_string(),
        };
        let color = value
            .get("color")
            .and_then(|v| v.as_str())
            .and_then(Color::from_hex)
            .unwrap_or_else(Color::black);
        let size = value.get("size").and_then(|v| v.as_f64()).unwrap_or(2.0);
        let composite_mode = match value.get("compositeMode").and_then(|v| v.as_str()) {
            Some("erase") => CompositeMode::Erase,
            _ => CompositeMode::Normal,
        };
        let points: Vec<f32> = value
            .get("points")
            .and_then(|v| v.as_array())
            .map(|arr| {
                arr.iter()
                    .filter_map(|v| v.as_f64())
                    .map(|v| v as f32)
                    .collect()
            })
            .unwrap_or_default();
        let length = value
            .get("length")
            .and_then(|v| v.as_u64())
            .map(|l| l as usize)
            .unwrap_or(points.len())
            .min(points.len());
        let original_length = value
            .get("originalLength")
            .and_then(|v| v.as_u64())
            .map(|l| l as usize);

        Self {
            id,
            color,
            size,
            composite_mode,
            points,
            length: length & !1,
            original_length,
        }
    }

    /// Rebuild an engine stroke from wire form.
    pub fn into_stroke(self) -> Stroke {
        let mut floats = self.points;
        floats.truncate(self.length);
        Stroke {
            id: Uuid::parse_str(&self.id).unwrap_or_else(|_| Uuid::new_v4()),
            color: self.color,
            size: self.size,
            composite: self.composite_mode,
            points: PointBuffer::from_floats(floats),
            original_len: self.original_length,
        }
    }
}

/// The serialization unit: every committed stroke plus the surface
/// parameters needed to reproduce the drawing.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawingDocument {
    pub version: u32,
    pub device_pixel_ratio: f64,
    pub background_color: Color,
    pub strokes: Vec<StrokeRecord>,
}

impl DrawingDocument {
    /// Build a document from committed strokes.
    pub fn from_strokes(strokes: &[Stroke], device_pixel_ratio: f64, background: Color) -> Self {
        Self {
            version: DOCUMENT_VERSION,
            device_pixel_ratio,
            background_color: background,
            strokes: strokes.iter().map(StrokeRecord::from_stroke).collect(),
        }
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parse a document from JSON.
    ///
    /// The envelope is validated strictly — unparseable JSON or a missing
    /// stroke list is an error and leaves nothing half-imported. Within a
    /// valid envelope, individual stroke fields fall back to defaults
    /// when missing.
    pub fn from_json(json: &str) -> Result<Self, DocumentError> {
        let data: serde_json::Value = serde_json::from_str(json)?;
        let stroke_values = data
            .get("strokes")
            .and_then(|s| s.as_array())
            .ok_or(DocumentError::MissingStrokes)?;

        let version = data
            .get("version")
            .and_then(|v| v.as_u64())
            .map(|v| v as u32)
            .unwrap_or(DOCUMENT_VERSION);
        let device_pixel_ratio = data
            .get("devicePixelRatio")
            .and_then(|v| v.as_f64())
            .unwrap_or(1.0);
        let background_color = data
            .get("backgroundColor")
            .and_then(|v| v.as_str())
            .and_then(Color::from_hex)
            .unwrap_or_else(Color::white);

        Ok(Self {
            version,
            device_pixel_ratio,
            background_color,
            strokes: stroke_values.iter().map(StrokeRecord::from_value).collect(),
        })
    }

    /// Rebuild engine strokes from the document.
    pub fn into_strokes(self) -> Vec<Stroke> {
        self.strokes
            .into_iter()
            .map(StrokeRecord::into_stroke)
            .collect()
    }
}
