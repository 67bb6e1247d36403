//! Incremental pipeline: advance stage-by-stage, inspecting each
//! intermediate result before continuing.
//!
//! Unlike [`crate::process`] which runs the entire pipeline in one call,
//! [`Pipeline`] lets the caller drive execution one step at a time:
//!
//! ```rust
//! # use millpath_pipeline::{Pipeline, PipelineConfig, PipelineError, Point};
//! # fn run(records: &str) -> Result<(), PipelineError> {
//! let built = Pipeline::new(records, PipelineConfig::default())?
//!     .collect()
//!     .build();
//!
//! println!("{} paths", built.paths().len());
//! let mut tour = built.into_tour(Point::ORIGIN);
//! while let Some(path) = tour.next_path()? {
//!     // hand `path` to the emitter
//! #   let _ = path;
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Each stage method consumes `self` and returns the next pipeline state,
//! carrying the counts needed for diagnostics.

use crate::builder::build_paths;
use crate::collect::collect_segments;
use crate::record::parse_records;
use crate::tour::Tour;
use crate::types::{Path, PipelineConfig, PipelineError, Point, Segment};

/// Entry point for the staged pipeline.
pub struct Pipeline;

impl Pipeline {
    /// Validate `config` and wrap the record text.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] if the configuration is
    /// rejected by [`PipelineConfig::validate`].
    #[allow(clippy::new_ret_no_self)]
    pub fn new(records: &str, config: PipelineConfig) -> Result<Pending<'_>, PipelineError> {
        config.validate()?;
        Ok(Pending { config, records })
    }
}

// ───────────────────────── Stage 0: Pending ──────────────────────────

/// Pipeline state before any record has been read.
#[must_use = "pipeline stages are consumed by advancing; call .collect() to continue"]
pub struct Pending<'a> {
    config: PipelineConfig,
    records: &'a str,
}

impl Pending<'_> {
    /// Parse the records and collect millimetre segments.
    pub fn collect(self) -> Collected {
        let segments = collect_segments(parse_records(self.records), &self.config);
        Collected { segments }
    }
}

// ───────────────────────── Stage 1: Collected ─────────────────────────

/// Pipeline state after line collection.
#[must_use = "pipeline stages are consumed by advancing; call .build() to continue"]
pub struct Collected {
    segments: Vec<Segment>,
}

impl Collected {
    /// The collected segment pool, in drawing order.
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Join the segments into maximal paths.
    pub fn build(self) -> Built {
        let segment_count = self.segments.len();
        Built {
            paths: build_paths(self.segments),
            segment_count,
        }
    }
}

// ───────────────────────── Stage 2: Built ─────────────────────────────

/// Pipeline state after path building.
#[must_use = "call .into_tour() or .into_result() to use the built paths"]
pub struct Built {
    paths: Vec<Path>,
    segment_count: usize,
}

impl Built {
    /// The assembled paths, in build order.
    #[must_use]
    pub fn paths(&self) -> &[Path] {
        &self.paths
    }

    /// Hand the paths to a tour planner starting at `head`.
    #[must_use]
    pub fn into_tour(self, head: Point) -> Tour {
        Tour::new(self.paths, head)
    }

    /// Finish without planning.
    #[must_use]
    pub fn into_result(self) -> ProcessResult {
        ProcessResult {
            paths: self.paths,
            segment_count: self.segment_count,
        }
    }
}

/// Result of running the pipeline up to path building.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessResult {
    /// The assembled paths, unordered.
    pub paths: Vec<Path>,

    /// Number of segments the collector produced.
    pub segment_count: usize,
}
