//! Line collection: turn draw records into millimetre segments.
//!
//! This is the first stage of the pipeline. Each `Line` and `Close`
//! record becomes one directed [`Segment`]; zero-length segments are
//! dropped, and an optional stroke-width filter keeps only segments
//! drawn at a chosen width.

use std::ops::ControlFlow;

use tracing::{debug, warn};

use crate::record::{DrawRecord, RecordError};
use crate::types::{PipelineConfig, Point, Segment};

/// Millimetres per source unit.
///
/// The flattening device renders at 720 dpi, so one unit is 1/720 inch.
pub const SOURCE_UNIT_MM: f64 = 2.54 / 72.0;

/// Incremental collector over a draw-record stream.
#[derive(Debug, Clone)]
pub struct LineCollector {
    scale: f64,
    width_filter: Option<f64>,
    current: Point,
    figure_start: Point,
    width: Option<f64>,
    segments: Vec<Segment>,
    filtered: usize,
    finished: bool,
}

impl LineCollector {
    /// Create a collector using the scale and width filter from `config`.
    #[must_use]
    pub const fn new(config: &PipelineConfig) -> Self {
        Self {
            scale: config.scale,
            width_filter: config.width,
            current: Point::ORIGIN,
            figure_start: Point::ORIGIN,
            width: None,
            segments: Vec::new(),
            filtered: 0,
            finished: false,
        }
    }

    /// Convert a source value to millimetres.
    fn to_mm(&self, value: f64) -> f64 {
        value * self.scale * SOURCE_UNIT_MM
    }

    /// Feed one record.
    ///
    /// Returns [`ControlFlow::Break`] once `EndOfPage` has been seen;
    /// records pushed after that are ignored.
    pub fn push(&mut self, record: DrawRecord) -> ControlFlow<()> {
        if self.finished {
            return ControlFlow::Break(());
        }
        match record {
            DrawRecord::Move { x, y } => {
                let point = Point::new(self.to_mm(x), self.to_mm(y));
                self.current = point;
                self.figure_start = point;
            }
            DrawRecord::Line { x, y } => {
                let point = Point::new(self.to_mm(x), self.to_mm(y));
                self.emit(Segment::new(self.current, point));
                self.current = point;
            }
            DrawRecord::Close => {
                self.emit(Segment::new(self.current, self.figure_start));
                self.current = self.figure_start;
            }
            DrawRecord::SetWidth(width) => {
                self.width = Some((self.to_mm(width) * 10.0).round() / 10.0);
            }
            DrawRecord::EndOfPage => {
                self.finished = true;
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    /// Keep `segment` unless it is zero-length or filtered out by width.
    fn emit(&mut self, segment: Segment) {
        if segment.is_degenerate() {
            return;
        }
        if let Some(target) = self.width_filter
            && self.width != Some(target)
        {
            self.filtered += 1;
            return;
        }
        self.segments.push(segment);
    }

    /// Number of segments discarded by the width filter so far.
    #[must_use]
    pub const fn filtered(&self) -> usize {
        self.filtered
    }

    /// Consume the collector and return the segment pool.
    #[must_use]
    pub fn into_segments(self) -> Vec<Segment> {
        self.segments
    }
}

/// Collect every segment from a stream of parsed records.
///
/// Record errors are logged as warnings and skipped. Collection stops at
/// the first `EndOfPage` record.
pub fn collect_segments<I>(records: I, config: &PipelineConfig) -> Vec<Segment>
where
    I: IntoIterator<Item = Result<DrawRecord, RecordError>>,
{
    let mut collector = LineCollector::new(config);
    for record in records {
        match record {
            Ok(record) => {
                if collector.push(record).is_break() {
                    break;
                }
            }
            Err(e) => warn!("skipping record: {e}"),
        }
    }
    debug!(
        kept = collector.segments.len(),
        filtered = collector.filtered(),
        "collected segments"
    );
    collector.into_segments()
}
