//! Stroke data model.

use crate::color::Color;
use crate::point_buffer::PointBuffer;
use kurbo::Point;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for strokes.
pub type StrokeId = Uuid;

/// How a stroke's pixels combine with existing surface content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompositeMode {
    /// Paint over existing pixels.
    #[default]
    Normal,
    /// Subtract from existing pixels (eraser).
    Erase,
}

/// One continuous pointer-down-to-pointer-up gesture.
///
/// Vertices accumulate in [`points`](Self::points) while the stroke is in
/// progress; once committed to history the stroke is never mutated again.
#[derive(Debug, Clone)]
pub struct Stroke {
    pub id: StrokeId,
    pub color: Color,
    /// Line width in logical pixels.
    pub size: f64,
    pub composite: CompositeMode,
    pub points: PointBuffer,
    /// Float count before simplification, set only when simplification
    /// actually reduced the stroke.
    pub original_len: Option<usize>,
}

impl Stroke {
    /// Start a new stroke at `start`.
    pub fn new(color: Color, size: f64, composite: CompositeMode, start: Point) -> Self {
        let mut points = PointBuffer::new();
        points.push(start);
        Self {
            id: Uuid::new_v4(),
            color,
            size,
            composite,
            points,
            original_len: None,
        }
    }

    /// A stroke with fewer than two vertices renders as a filled circle
    /// of diameter [`size`](Self::size) rather than a polyline.
    pub fn is_dot(&self) -> bool {
        self.points.len() < 4
    }
}

/// Distance from a point to a line segment (a→b).
pub fn point_to_segment_dist(point: Point, a: Point, b: Point) -> f64 {
    let seg = kurbo::Vec2::new(b.x - a.x, b.y - a.y);
    let pv = kurbo::Vec2::new(point.x - a.x, point.y - a.y);
    let len_sq = seg.hypot2();
    if len_sq < f64::EPSILON {
        return pv.hypot();
    }
    let t = (pv.dot(seg) / len_sq).clamp(0.0, 1.0);
    let proj = Point::new(a.x + t * seg.x, a.y + t * seg.y);
    ((point.x - proj.x).powi(2) + (point.y - proj.y).powi(2)).sqrt()
}

/// Minimum distance from a point to a polyline.
pub fn point_to_polyline_dist(point: Point, points: &[Point]) -> f64 {
    points
        .windows(2)
        .map(|w| point_to_segment_dist(point, w[0], w[1]))
        .fold(f64::INFINITY, f64::min)
}
