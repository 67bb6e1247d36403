//! Path building: union loose segments into maximal paths.
//!
//! Segments arrive in drawing order with no connectivity information.
//! The builder grows one path at a time by repeatedly pulling a pool
//! segment that shares an endpoint with the open path, until nothing
//! more attaches; the path is then finished and a new one is started
//! from whatever segment remains.
//!
//! Matching is exact coordinate equality. Among several candidate
//! segments, the first in pool order wins. Loops are extended at any of
//! their points, not only at the closing point, by first spinning the
//! loop so the junction becomes its start.

use tracing::debug;

use crate::types::{Path, Point, Segment};

/// Working set of segments not yet assigned to a path.
///
/// Removal preserves the relative order of the remaining segments, so
/// "first match wins" always refers to the original drawing order.
#[derive(Debug, Clone, Default)]
pub struct SegmentPool {
    segments: Vec<Segment>,
}

impl SegmentPool {
    /// Create a pool from the collected segments.
    #[must_use]
    pub const fn new(segments: Vec<Segment>) -> Self {
        Self { segments }
    }

    /// Returns `true` if no segments remain.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Number of segments remaining.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.segments.len()
    }

    /// Remove and return the first segment in the pool.
    pub fn take_any(&mut self) -> Option<Segment> {
        (!self.segments.is_empty()).then(|| self.segments.remove(0))
    }

    /// Remove and return the first segment with an endpoint at `point`.
    pub fn take_touching(&mut self, point: Point) -> Option<Segment> {
        let index = self.segments.iter().position(|s| s.touches(point))?;
        Some(self.segments.remove(index))
    }
}

/// Build maximal paths from a set of segments.
///
/// Every input segment ends up in exactly one output path, as exactly
/// one adjacent point pair. Output paths are in the order they were
/// finished.
#[must_use = "returns the assembled paths"]
pub fn build_paths(segments: Vec<Segment>) -> Vec<Path> {
    let segment_count = segments.len();
    let mut pool = SegmentPool::new(segments);
    let mut paths = Vec::new();

    while let Some(seed) = pool.take_any() {
        let mut path = Path::from_segment(seed);
        while extend(&mut path, &mut pool) {}
        paths.push(path);
    }

    debug!(
        segments = segment_count,
        paths = paths.len(),
        loops = paths.iter().filter(|p| p.is_loop()).count(),
        "built paths"
    );
    paths
}

/// Attach one more pool segment to `path`.
///
/// Returns `false` when nothing in the pool touches the path, which
/// finishes it.
fn extend(path: &mut Path, pool: &mut SegmentPool) -> bool {
    if path.is_loop() {
        let found = path
            .iter()
            .enumerate()
            .find_map(|(index, point)| pool.take_touching(point).map(|s| (index, s)));
        let Some((index, segment)) = found else {
            return false;
        };
        path.spin(index);
        let start = path.start();
        path.prepend(segment.far_end(start));
        return true;
    }

    let start = path.start();
    if let Some(segment) = pool.take_touching(start) {
        path.prepend(segment.far_end(start));
        return true;
    }

    let end = path.end();
    if let Some(segment) = pool.take_touching(end) {
        path.append(segment.far_end(end));
        return true;
    }

    false
}
