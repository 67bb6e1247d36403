//! millpath-pipeline: Pure path assembly and tour planning (sans-IO).
//!
//! Turns flattened draw records into ordered, oriented paths through:
//! record parsing -> line collection -> path building -> tour planning.
//!
//! This crate has **no I/O dependencies** -- it operates on in-memory
//! text and returns structured data. Serializing the planned tour to
//! G-code lives in `millpath-export`; files and stdin/stdout live in the
//! `millpath` binary.

pub mod builder;
pub mod collect;
pub mod pipeline;
pub mod record;
pub mod tour;
pub mod types;

pub use builder::{SegmentPool, build_paths};
pub use collect::{LineCollector, SOURCE_UNIT_MM, collect_segments};
pub use pipeline::{Pipeline, ProcessResult};
pub use record::{DrawRecord, RecordError, parse_records};
pub use tour::{Tour, plan_tour};
pub use types::{Path, PipelineConfig, PipelineError, Point, Segment};

/// Run the pipeline up to path building.
///
/// Parses `records`, collects millimetre segments, and joins them into
/// maximal paths. The paths are returned unordered; feed them to a
/// [`Tour`] (or [`plan_tour`]) to choose the cutting order.
///
/// Unknown or malformed record lines are logged and skipped.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidConfig`] if `config` fails validation.
pub fn process(records: &str, config: &PipelineConfig) -> Result<ProcessResult, PipelineError> {
    Ok(Pipeline::new(records, config.clone())?
        .collect()
        .build()
        .into_result())
}
