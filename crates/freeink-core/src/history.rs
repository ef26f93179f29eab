//! Commit history, redo stack and the raster snapshot ring.

use crate::stroke::Stroke;
use std::collections::VecDeque;

/// Capture a full-raster snapshot every this many commits.
pub const DEFAULT_SNAPSHOT_INTERVAL: usize = 8;

/// Keep at most this many snapshots alive.
pub const DEFAULT_MAX_SNAPSHOTS: usize = 3;

/// A full-raster capture tagged with the committed-stroke count at
/// capture time.
#[derive(Debug, Clone)]
pub struct RasterSnapshot<R> {
    pub stroke_count: usize,
    pub raster: R,
}

/// Bounded ring of raster snapshots, FIFO eviction.
#[derive(Debug, Clone)]
pub struct SnapshotRing<R> {
    capacity: usize,
    entries: VecDeque<RasterSnapshot<R>>,
}

impl<R> SnapshotRing<R> {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity),
        }
    }

    /// Record a snapshot, evicting the oldest beyond capacity.
    pub fn push(&mut self, stroke_count: usize, raster: R) {
        if self.capacity == 0 {
            return;
        }
        self.entries.push_back(RasterSnapshot {
            stroke_count,
            raster,
        });
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    /// Find the newest snapshot whose tag is ≤ `stroke_count`.
    pub fn newest_at_or_below(&self, stroke_count: usize) -> Option<&RasterSnapshot<R>> {
        self.entries
            .iter()
            .rev()
            .find(|s| s.stroke_count <= stroke_count)
    }

    /// Drop snapshots tagged above `stroke_count`.
    ///
    /// Called on undo: an entry above the new committed count captures
    /// strokes that may be replaced by later commits, so it can never be
    /// blitted again safely.
    pub fn drop_above(&mut self, stroke_count: usize) {
        self.entries.retain(|s| s.stroke_count <= stroke_count);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Tags of the stored snapshots, oldest first.
    pub fn stroke_counts(&self) -> Vec<usize> {
        self.entries.iter().map(|s| s.stroke_count).collect()
    }
}

/// Committed strokes, redo stack and snapshots.
///
/// Strokes commit in flush order and are immutable afterwards. The redo
/// stack is strict LIFO and is invalidated by any new commit.
#[derive(Debug)]
pub struct History<R> {
    committed: Vec<Stroke>,
    redo: Vec<Stroke>,
    snapshots: SnapshotRing<R>,
    interval: usize,
}

impl<R> History<R> {
    pub fn new(interval: usize, max_snapshots: usize) -> Self {
        Self {
            committed: Vec::new(),
            redo: Vec::new(),
            snapshots: SnapshotRing::new(max_snapshots),
            interval,
        }
    }

    /// Push a finished stroke; returns true when a snapshot is due.
    pub fn commit(&mut self, stroke: Stroke) -> bool {
        self.committed.push(stroke);
        self.redo.clear();
        self.interval > 0 && self.committed.len() % self.interval == 0
    }

    /// Record a raster snapshot for the current committed count.
    pub fn record_snapshot(&mut self, raster: R) {
        self.snapshots.push(self.committed.len(), raster);
    }

    /// Move the newest committed stroke to the redo stack.
    ///
    /// Returns false when there is nothing to undo.
    pub fn undo(&mut self) -> bool {
        let Some(stroke) = self.committed.pop() else {
            return false;
        };
        self.redo.push(stroke);
        self.snapshots.drop_above(self.committed.len());
        true
    }

    /// Re-commit the most recently undone stroke.
    ///
    /// Returns the stroke so the caller can draw it directly; `None` when
    /// the redo stack is empty.
    pub fn redo(&mut self) -> Option<&Stroke> {
        let stroke = self.redo.pop()?;
        self.committed.push(stroke);
        self.committed.last()
    }

    /// Replace the committed list wholesale (import); resets redo and
    /// snapshot state.
    pub fn replace(&mut self, strokes: Vec<Stroke>) {
        self.committed = strokes;
        self.redo.clear();
        self.snapshots.clear();
    }

    pub fn clear(&mut self) {
        self.committed.clear();
        self.redo.clear();
        self.snapshots.clear();
    }

    /// Drop all snapshots (their rasters no longer match the surface,
    /// e.g. after a resize).
    pub fn invalidate_snapshots(&mut self) {
        self.snapshots.clear();
    }

    pub fn strokes(&self) -> &[Stroke] {
        &self.committed
    }

    pub fn len(&self) -> usize {
        self.committed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.committed.is_empty()
    }

    pub fn can_undo(&self) -> bool {
        !self.committed.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    /// Newest snapshot usable for the given committed count.
    pub fn snapshot_at_or_below(&self, stroke_count: usize) -> Option<&RasterSnapshot<R>> {
        self.snapshots.newest_at_or_below(stroke_count)
    }

    /// Snapshot tags, oldest first.
    pub fn snapshot_counts(&self) -> Vec<usize> {
        self.snapshots.stroke_counts()
    }
}
