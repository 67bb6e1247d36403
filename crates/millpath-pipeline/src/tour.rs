//! Tour planning: order and orient paths to minimize travel distance.
//!
//! Uses a nearest-neighbor greedy heuristic. From the current head
//! position, every remaining path offers its start (traversed forward)
//! and its end (traversed reversed) as entry candidates; loops also offer
//! every one of their points, entered by spinning the loop. The closest
//! candidate by squared Euclidean distance wins, and on exact ties the
//! first candidate scanned is kept.
//!
//! Planning is pull-based through [`Tour::next_path`], so each planned
//! path can be handed straight to the emitter before the next one is
//! chosen.

use crate::types::{Path, PipelineError, Point};

/// The best entry seen so far during one selection scan.
#[derive(Debug, Clone, Copy)]
struct Entry {
    /// Index of the path in the remaining set.
    path: usize,
    /// Index of the entry point within the path.
    point: usize,
    /// Whether the path is traversed end to start.
    reversed: bool,
    /// Squared distance from the head to the entry point.
    distance: f64,
}

/// Greedy nearest-neighbor planner over a set of paths.
#[derive(Debug, Clone)]
pub struct Tour {
    paths: Vec<Path>,
    head: Point,
}

impl Tour {
    /// Start planning from `head`, usually the emitter's current position.
    #[must_use]
    pub const fn new(paths: Vec<Path>, head: Point) -> Self {
        Self { paths, head }
    }

    /// The position the next selection is measured from.
    #[must_use]
    pub const fn head(&self) -> Point {
        self.head
    }

    /// Number of paths not yet visited.
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.paths.len()
    }

    /// Select, orient, and remove the next path.
    ///
    /// The returned path starts at its chosen entry point; the head moves
    /// to its end. Returns `Ok(None)` once every path has been visited.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::TourInvariant`] if paths remain but none
    /// was selected. This cannot happen for well-formed paths and
    /// signals a logic defect.
    pub fn next_path(&mut self) -> Result<Option<Path>, PipelineError> {
        if self.paths.is_empty() {
            return Ok(None);
        }

        let Some(entry) = self.select() else {
            return Err(PipelineError::TourInvariant {
                remaining: self.paths.len(),
            });
        };

        let mut path = self.paths.remove(entry.path);
        if entry.reversed {
            path.reverse();
        } else {
            path.spin(entry.point);
        }
        self.head = path.end();
        Ok(Some(path))
    }

    /// Scan every remaining candidate and return the closest.
    fn select(&self) -> Option<Entry> {
        let mut best: Option<Entry> = None;
        let mut consider = |path: usize, point: usize, reversed: bool, at: Point| {
            let distance = self.head.distance_squared(at);
            if best.is_none_or(|b| distance < b.distance) {
                best = Some(Entry {
                    path,
                    point,
                    reversed,
                    distance,
                });
            }
        };

        for (index, path) in self.paths.iter().enumerate() {
            if path.is_loop() {
                for (point_index, point) in path.iter().enumerate() {
                    consider(index, point_index, false, point);
                }
            }
            consider(index, 0, false, path.start());
            consider(index, path.point_count() - 1, true, path.end());
        }

        best
    }
}

/// Plan the whole tour at once.
///
/// Convenience wrapper that drains a [`Tour`] into a vector.
///
/// # Errors
///
/// Propagates [`PipelineError::TourInvariant`] from [`Tour::next_path`].
pub fn plan_tour(paths: Vec<Path>, head: Point) -> Result<Vec<Path>, PipelineError> {
    let mut tour = Tour::new(paths, head);
    let mut ordered = Vec::with_capacity(tour.remaining());
    while let Some(path) = tour.next_path()? {
        ordered.push(path);
    }
    Ok(ordered)
}
