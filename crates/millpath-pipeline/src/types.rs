//! Shared types for the millpath pipeline.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// A 2D point in working units (millimetres).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    /// Horizontal position in millimetres.
    pub x: f64,
    /// Vertical position in millimetres.
    pub y: f64,
}

impl Point {
    /// The machine origin.
    pub const ORIGIN: Self = Self::new(0.0, 0.0);

    /// Create a new point.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Squared Euclidean distance to another point.
    ///
    /// Avoids the square root for comparison purposes.
    #[must_use]
    pub fn distance_squared(self, other: Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx.mul_add(dx, dy * dy)
    }

    /// Euclidean distance to another point.
    #[must_use]
    pub fn distance(self, other: Self) -> f64 {
        self.distance_squared(other).sqrt()
    }
}

/// A single straight line between two points.
///
/// Undirected for matching purposes, but stored with the orientation
/// in which it was drawn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    /// Point the segment was drawn from.
    pub start: Point,
    /// Point the segment was drawn to.
    pub end: Point,
}

impl Segment {
    /// Create a new segment.
    #[must_use]
    pub const fn new(start: Point, end: Point) -> Self {
        Self { start, end }
    }

    /// Returns `true` if either endpoint equals `point` exactly.
    #[must_use]
    pub fn touches(&self, point: Point) -> bool {
        self.start == point || self.end == point
    }

    /// The endpoint opposite `point`.
    ///
    /// If `point` is the start, returns the end; otherwise returns the
    /// start. Callers are expected to have checked [`touches`](Self::touches).
    #[must_use]
    pub fn far_end(&self, point: Point) -> Point {
        if self.start == point {
            self.end
        } else {
            self.start
        }
    }

    /// Returns `true` if both endpoints coincide.
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        self.start == self.end
    }

    /// Returns `true` if `other` joins the same two points, in either
    /// orientation.
    #[must_use]
    pub fn same_edge(&self, other: &Self) -> bool {
        (self.start == other.start && self.end == other.end)
            || (self.start == other.end && self.end == other.start)
    }
}

/// An ordered chain of at least two points joined end to end.
///
/// Every adjacent pair of points corresponds to exactly one segment
/// consumed while building the path. A path whose first and last points
/// coincide is a loop.
///
/// The only constructors are [`from_segment`](Self::from_segment) and
/// [`from_points`](Self::from_points), so `start` and `end` always exist.
#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    points: VecDeque<Point>,
}

impl Path {
    /// Start a new path from a single segment.
    #[must_use]
    pub fn from_segment(segment: Segment) -> Self {
        Self {
            points: VecDeque::from([segment.start, segment.end]),
        }
    }

    /// Build a path from an explicit point list.
    ///
    /// Returns `None` if fewer than two points are given.
    #[must_use]
    pub fn from_points(points: Vec<Point>) -> Option<Self> {
        (points.len() >= 2).then(|| Self {
            points: points.into(),
        })
    }

    /// First point of the path.
    #[must_use]
    pub fn start(&self) -> Point {
        self.points[0]
    }

    /// Last point of the path.
    #[must_use]
    pub fn end(&self) -> Point {
        self.points[self.points.len() - 1]
    }

    /// Number of points, including the repeated closing point of a loop.
    #[must_use]
    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    /// Returns `true` if the first and last points are equal.
    #[must_use]
    pub fn is_loop(&self) -> bool {
        self.start() == self.end()
    }

    /// Iterate over the points in traversal order.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = Point> + ExactSizeIterator + '_ {
        self.points.iter().copied()
    }

    /// Decompose the path back into the segments it was built from,
    /// oriented along the traversal direction.
    pub fn segments(&self) -> impl Iterator<Item = Segment> + '_ {
        self.points
            .iter()
            .zip(self.points.iter().skip(1))
            .map(|(&a, &b)| Segment::new(a, b))
    }

    /// Total Euclidean length along the path.
    #[must_use]
    pub fn length(&self) -> f64 {
        self.segments().map(|s| s.start.distance(s.end)).sum()
    }

    /// Add a point before the current start.
    pub fn prepend(&mut self, point: Point) {
        self.points.push_front(point);
    }

    /// Add a point after the current end.
    pub fn append(&mut self, point: Point) {
        self.points.push_back(point);
    }

    /// Reverse the traversal direction in place.
    pub fn reverse(&mut self) {
        self.points.make_contiguous().reverse();
    }

    /// Rotate a loop so the point at `index` becomes its start and end.
    ///
    /// The closing point is dropped, the ring is rotated, and the new
    /// start is repeated at the end, so the cyclic sequence of segments
    /// is unchanged and the junction point is never duplicated.
    ///
    /// Does nothing for open paths, for `index == 0`, or for the closing
    /// index (which already equals the start).
    pub fn spin(&mut self, index: usize) {
        if !self.is_loop() || index == 0 || index >= self.points.len() - 1 {
            return;
        }
        self.points.pop_back();
        self.points.rotate_left(index);
        let start = self.points[0];
        self.points.push_back(start);
    }

    /// Consumes the path and returns its points.
    #[must_use]
    pub fn into_points(self) -> Vec<Point> {
        self.points.into()
    }
}

/// Configuration for turning draw records into paths.
///
/// # Stroke-width filter
///
/// When `width` is set, only segments drawn while the most recent
/// `SetWidth` record equals it exactly are kept. Widths are compared
/// after scaling to millimetres and rounding to 0.1 mm, so a filter of
/// `0.3` matches a stroke recorded as `0.3`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Uniform scale factor applied to every source coordinate.
    pub scale: f64,

    /// Keep only segments drawn with this stroke width (millimetres).
    pub width: Option<f64>,
}

impl PipelineConfig {
    /// Default uniform scale factor.
    pub const DEFAULT_SCALE: f64 = 1.0;

    /// Check that the configuration values are usable.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] if `scale` is not a
    /// positive finite number or `width` is not finite.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if !self.scale.is_finite() || self.scale <= 0.0 {
            return Err(PipelineError::InvalidConfig(format!(
                "scale must be positive and finite, got {}",
                self.scale
            )));
        }
        if let Some(width) = self.width
            && !width.is_finite()
        {
            return Err(PipelineError::InvalidConfig(format!(
                "width filter must be finite, got {width}"
            )));
        }
        Ok(())
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            scale: Self::DEFAULT_SCALE,
            width: None,
        }
    }
}

/// Errors that can occur during pipeline processing.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Pipeline configuration is invalid.
    #[error("invalid pipeline configuration: {0}")]
    InvalidConfig(String),

    /// The tour planner found no candidate while paths remained.
    ///
    /// Indicates a logic defect rather than bad input.
    #[error("tour planner selected no path with {remaining} path(s) remaining")]
    TourInvariant {
        /// Number of paths still waiting to be visited.
        remaining: usize,
    },
}
