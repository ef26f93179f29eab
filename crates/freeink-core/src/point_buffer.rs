//! Flat vertex storage for strokes.

use kurbo::Point;

/// Initial capacity of a fresh buffer, in vertices.
///
/// Strokes shorter than this never reallocate; longer ones grow by
/// doubling, which keeps appends O(1) amortized.
pub const INITIAL_VERTEX_CAPACITY: usize = 128;

/// A growable buffer of interleaved x/y coordinates.
///
/// Coordinates are stored as `f32` pairs: the i-th vertex is
/// `(data[2i], data[2i + 1])`. The used length is always even. Callers
/// iterate, draw and serialize through the used portion only; spare
/// capacity exists solely for the in-progress stroke and is dropped with
/// [`PointBuffer::trim`] once the stroke ends.
#[derive(Debug, Clone, PartialEq)]
pub struct PointBuffer {
    data: Vec<f32>,
}

impl PointBuffer {
    /// Create an empty buffer with the default capacity.
    pub fn new() -> Self {
        Self::with_vertex_capacity(INITIAL_VERTEX_CAPACITY)
    }

    /// Create an empty buffer with room for `vertices` vertices.
    pub fn with_vertex_capacity(vertices: usize) -> Self {
        Self {
            data: Vec::with_capacity(vertices * 2),
        }
    }

    /// Build a buffer from an interleaved coordinate slice.
    ///
    /// A trailing unpaired float is dropped so the even-length invariant
    /// holds.
    pub fn from_floats(mut data: Vec<f32>) -> Self {
        if data.len() % 2 != 0 {
            data.pop();
        }
        Self { data }
    }

    /// Append one vertex.
    pub fn push(&mut self, point: Point) {
        self.data.push(point.x as f32);
        self.data.push(point.y as f32);
    }

    /// Number of used floats (always even).
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if the buffer holds no vertices.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Number of stored vertices.
    pub fn vertex_count(&self) -> usize {
        self.data.len() / 2
    }

    /// Current capacity in floats.
    pub fn capacity(&self) -> usize {
        self.data.capacity()
    }

    /// Read-only view of the used coordinates.
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Get the i-th vertex.
    pub fn point(&self, index: usize) -> Option<Point> {
        let x = *self.data.get(index * 2)?;
        let y = *self.data.get(index * 2 + 1)?;
        Some(Point::new(f64::from(x), f64::from(y)))
    }

    /// Get the most recently appended vertex.
    pub fn last_point(&self) -> Option<Point> {
        if self.is_empty() {
            return None;
        }
        self.point(self.vertex_count() - 1)
    }

    /// Iterate over the stored vertices.
    pub fn points(&self) -> impl Iterator<Item = Point> + '_ {
        self.data
            .chunks_exact(2)
            .map(|pair| Point::new(f64::from(pair[0]), f64::from(pair[1])))
    }

    /// Drop spare capacity once the stroke is finished.
    pub fn trim(&mut self) {
        self.data.shrink_to_fit();
    }
}

impl Default for PointBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_buffer() {
        let buf = PointBuffer::new();
        assert!(buf.is_empty());
        assert_eq!(buf.len(), 0);
        assert_eq!(buf.vertex_count(), 0);
        assert!(buf.last_point().is_none());
    }

    #[test]
    fn test_push_and_read() {
        let mut buf = PointBuffer::new();
        buf.push(Point::new(1.0, 2.0));
        buf.push(Point::new(3.0, 4.0));

        assert_eq!(buf.len(), 4);
        assert_eq!(buf.vertex_count(), 2);
        assert_eq!(buf.point(0), Some(Point::new(1.0, 2.0)));
        assert_eq!(buf.point(1), Some(Point::new(3.0, 4.0)));
        assert_eq!(buf.last_point(), Some(Point::new(3.0, 4.0)));
        assert!(buf.point(2).is_none());
    }

    #[test]
    fn test_growth_preserves_data() {
        let mut buf = PointBuffer::with_vertex_capacity(2);
        for i in 0..1000 {
            buf.push(Point::new(i as f64, (i * 2) as f64));
        }

        assert_eq!(buf.vertex_count(), 1000);
        for i in 0..1000 {
            assert_eq!(buf.point(i), Some(Point::new(i as f64, (i * 2) as f64)));
        }
    }

    #[test]
    fn test_trim_keeps_contents() {
        let mut buf = PointBuffer::new();
        buf.push(Point::new(5.0, 6.0));
        assert!(buf.capacity() >= INITIAL_VERTEX_CAPACITY * 2);

        buf.trim();
        assert_eq!(buf.len(), 2);
        assert_eq!(buf.point(0), Some(Point::new(5.0, 6.0)));
        assert!(buf.capacity() < INITIAL_VERTEX_CAPACITY * 2);
    }

    #[test]
    fn test_from_floats_drops_unpaired_tail() {
        let buf = PointBuffer::from_floats(vec![1.0, 2.0, 3.0]);
        assert_eq!(buf.len(), 2);
        assert_eq!(buf.vertex_count(), 1);
    }

    #[test]
    fn test_points_iteration() {
        let buf = PointBuffer::from_floats(vec![0.0, 0.0, 10.0, 0.0, 10.0, 10.0]);
        let collected: Vec<Point> = buf.points().collect();
        assert_eq!(
            collected,
            vec![
                Point::new(0.0, 0.0),
                Point::new(10.0, 0.0),
                Point::new(10.0, 10.0),
            ]
        );
    }
}
