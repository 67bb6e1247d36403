//! G-code export: the toolpath emitter.
//!
//! Drives a milling tool through planned paths with a two-state machine
//! (tool up / tool down). Each path is entered with a skip move at safe
//! height and then cut point by point at depth.
//!
//! ## Output
//!
//! ```text
//! G90
//! G21
//! G1 Z0.5 F500
//! G0 Z5
//! M3 S2000
//! G0 X10 Y10
//! G0 Z0.5
//! G1 Z-0.05 F30
//! G1 X20
//! ...
//! M5
//! G0 X0 Y0
//! M30
//! ```
//!
//! Every `X`, `Y`, `Z` and `F` token is written only when its formatted
//! value differs from the last one written, and a motion line with no
//! changed axis is dropped entirely.
//!
//! ## Backlash
//!
//! Each axis carries a bias of half its configured slack, signed by the
//! direction of the last move along that axis. A diagonal cut that flips
//! the bias on either axis is preceded by a zero-length correction move
//! so the slack is taken up before the cutter starts across.
//!
//! This is a pure serializer with no I/O; it returns a `String`.

use std::fmt::Write;

use serde::{Deserialize, Serialize};
use tracing::debug;

use millpath_pipeline::{Path, PipelineError, Point, Tour};

use crate::error::ExportError;

/// Motion command used for non-cutting moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SkipMotion {
    /// `G0` rapid positioning; controllers may ignore the feed rate.
    #[default]
    Rapid,
    /// `G1` linear move at the skip feed rate.
    Linear,
}

impl SkipMotion {
    /// The G-code word for this motion mode.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Rapid => "G0",
            Self::Linear => "G1",
        }
    }
}

/// Machine parameters for G-code output.
///
/// Feed rates are in mm/min, heights in mm, spindle speed in rpm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GcodeConfig {
    /// Feed rate while cutting.
    pub feed_cut: u32,
    /// Feed rate while plunging to cut depth; `0` means `feed_cut`.
    pub feed_down: u32,
    /// Feed rate while lifting to clearance height; `0` means `feed_skip`.
    pub feed_up: u32,
    /// Feed rate for skip moves.
    pub feed_skip: u32,
    /// Spindle speed.
    pub speed: u32,
    /// Cut depth.
    pub z_cut: f64,
    /// Safe height for skip moves.
    pub z_skip: f64,
    /// Height just above the work, used between skip and cut.
    pub z_clear: f64,
    /// Height the tool is parked at when the program ends.
    pub z_park: f64,
    /// Decimal places written for coordinates.
    pub places: usize,
    /// Steps per millimetre for quantization; `0` disables it.
    pub steps: f64,
    /// Mechanical slack on the X axis.
    pub backlash_x: f64,
    /// Mechanical slack on the Y axis.
    pub backlash_y: f64,
    /// Negate X and Y (mirror the drawing).
    pub negate: bool,
    /// Motion command for skip moves.
    pub skip_motion: SkipMotion,
}

impl GcodeConfig {
    /// Default cutting feed rate.
    pub const DEFAULT_FEED_CUT: u32 = 30;
    /// Default skip feed rate.
    pub const DEFAULT_FEED_SKIP: u32 = 500;
    /// Default spindle speed.
    pub const DEFAULT_SPEED: u32 = 2000;
    /// Default cut depth, assuming the bed has been levelled.
    pub const DEFAULT_Z_CUT: f64 = -0.05;
    /// Default skip height.
    pub const DEFAULT_Z_SKIP: f64 = 5.0;
    /// Default clearance height.
    pub const DEFAULT_Z_CLEAR: f64 = 0.5;
    /// Default park height.
    pub const DEFAULT_Z_PARK: f64 = 30.0;
    /// Default decimal places.
    pub const DEFAULT_PLACES: usize = 3;
    /// Largest accepted `places`.
    pub const MAX_PLACES: usize = 10;

    /// Plunge feed rate after applying the `0` default.
    #[must_use]
    pub const fn effective_feed_down(&self) -> u32 {
        if self.feed_down == 0 {
            self.feed_cut
        } else {
            self.feed_down
        }
    }

    /// Lift feed rate after applying the `0` default.
    #[must_use]
    pub const fn effective_feed_up(&self) -> u32 {
        if self.feed_up == 0 {
            self.feed_skip
        } else {
            self.feed_up
        }
    }

    /// Check that the configuration values are usable.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::InvalidConfig`] for non-finite heights,
    /// negative or non-finite `steps` or backlash, or `places` above
    /// [`MAX_PLACES`](Self::MAX_PLACES).
    pub fn validate(&self) -> Result<(), ExportError> {
        for (name, value) in [
            ("z_cut", self.z_cut),
            ("z_skip", self.z_skip),
            ("z_clear", self.z_clear),
            ("z_park", self.z_park),
        ] {
            if !value.is_finite() {
                return Err(ExportError::InvalidConfig(format!(
                    "{name} must be finite, got {value}"
                )));
            }
        }
        for (name, value) in [
            ("steps", self.steps),
            ("backlash_x", self.backlash_x),
            ("backlash_y", self.backlash_y),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ExportError::InvalidConfig(format!(
                    "{name} must be finite and non-negative, got {value}"
                )));
            }
        }
        if self.places > Self::MAX_PLACES {
            return Err(ExportError::InvalidConfig(format!(
                "places must be at most {}, got {}",
                Self::MAX_PLACES,
                self.places
            )));
        }
        Ok(())
    }
}

impl Default for GcodeConfig {
    fn default() -> Self {
        Self {
            feed_cut: Self::DEFAULT_FEED_CUT,
            feed_down: 0,
            feed_up: 0,
            feed_skip: Self::DEFAULT_FEED_SKIP,
            speed: Self::DEFAULT_SPEED,
            z_cut: Self::DEFAULT_Z_CUT,
            z_skip: Self::DEFAULT_Z_SKIP,
            z_clear: Self::DEFAULT_Z_CLEAR,
            z_park: Self::DEFAULT_Z_PARK,
            places: Self::DEFAULT_PLACES,
            steps: 0.0,
            backlash_x: 0.0,
            backlash_y: 0.0,
            negate: false,
            skip_motion: SkipMotion::default(),
        }
    }
}

/// Round `value` to the nearest multiple of `1 / steps`.
///
/// Returns `value` unchanged when `steps` is not positive.
#[must_use]
pub fn quantize(value: f64, steps: f64) -> f64 {
    if steps > 0.0 {
        (value * steps).round() / steps
    } else {
        value
    }
}

/// Format a coordinate with at most `places` decimals.
///
/// Trailing fractional zeros and a trailing decimal point are removed,
/// and negative zero is written as `0`.
///
/// ```
/// use millpath_export::gcode::format_coord;
///
/// assert_eq!(format_coord(10.5, 3), "10.5");
/// assert_eq!(format_coord(5.0, 3), "5");
/// assert_eq!(format_coord(-0.0001, 3), "0");
/// ```
#[must_use]
pub fn format_coord(value: f64, places: usize) -> String {
    let mut text = format!("{value:.places$}");
    if text.contains('.') {
        let trimmed = text.trim_end_matches('0').trim_end_matches('.').len();
        text.truncate(trimmed);
    }
    if text == "-0" {
        text.remove(0);
    }
    text
}

/// Whether the cutter is raised or at depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolState {
    /// At skip height; free to move.
    Up,
    /// At cut depth; moves remove material.
    Down,
}

/// Per-axis backlash offset added to written coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
struct Bias {
    x: f64,
    y: f64,
}

/// Counts and distances of the motion emitted for paths.
///
/// Only moves made by [`ToolpathEmitter::skip`] and
/// [`ToolpathEmitter::cut`] are counted. The header and footer Z moves
/// and the final return to the origin written by
/// [`ToolpathEmitter::finish`] are not.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolpathSummary {
    /// Paths emitted.
    pub paths: usize,
    /// Cut moves that changed position.
    pub cut_moves: usize,
    /// Skip moves that changed position.
    pub skip_moves: usize,
    /// Total cutting distance in mm.
    pub cut_distance: f64,
    /// Total skip distance in mm.
    pub skip_distance: f64,
}

/// Stateful G-code writer for one program.
///
/// Creating an emitter writes the program header; [`finish`](Self::finish)
/// writes the footer and returns the text.
#[derive(Debug, Clone)]
pub struct ToolpathEmitter {
    config: GcodeConfig,
    out: String,
    position: Point,
    tool: ToolState,
    bias: Bias,
    written_x: Option<String>,
    written_y: Option<String>,
    written_z: Option<String>,
    feed: Option<u32>,
    summary: ToolpathSummary,
}

impl ToolpathEmitter {
    /// Start a program: absolute metric mode, tool raised to skip height,
    /// spindle on. The head is assumed to be at the origin.
    #[must_use]
    pub fn new(config: &GcodeConfig) -> Self {
        let origin = format_coord(0.0, config.places);
        let mut emitter = Self {
            config: config.clone(),
            out: String::new(),
            position: Point::ORIGIN,
            tool: ToolState::Up,
            bias: Bias::default(),
            written_x: Some(origin.clone()),
            written_y: Some(origin),
            written_z: None,
            feed: None,
            summary: ToolpathSummary::default(),
        };
        let _ = writeln!(emitter.out, "G90");
        let _ = writeln!(emitter.out, "G21");
        emitter.raise();
        let _ = writeln!(emitter.out, "M3 S{}", emitter.config.speed);
        emitter
    }

    /// Current (unbiased) head position.
    #[must_use]
    pub const fn position(&self) -> Point {
        self.position
    }

    /// Current tool state.
    #[must_use]
    pub const fn tool(&self) -> ToolState {
        self.tool
    }

    /// Path motion emitted so far; see [`ToolpathSummary`] for what is
    /// excluded.
    #[must_use]
    pub const fn summary(&self) -> &ToolpathSummary {
        &self.summary
    }

    /// Move to `target` with the tool raised.
    pub fn skip(&mut self, target: Point) {
        if target == self.position {
            return;
        }
        self.tool_up();
        let bias = self.bias_toward(target);
        self.bias = bias;
        let feed = self.config.feed_skip;
        self.motion(self.config.skip_motion.code(), Some(offset(target, bias)), None, feed);
        self.summary.skip_moves += 1;
        self.summary.skip_distance += self.position.distance(target);
        self.position = target;
    }

    /// Cut a straight line to `target` at depth.
    #[allow(clippy::float_cmp)]
    pub fn cut(&mut self, target: Point) {
        if target == self.position {
            return;
        }
        let bias = self.bias_toward(target);
        let diagonal = target.x != self.position.x && target.y != self.position.y;
        let feed = self.config.feed_cut;
        if diagonal && bias != self.bias {
            self.motion("G1", Some(offset(self.position, bias)), None, feed);
        }
        self.bias = bias;
        self.tool_down();
        self.motion("G1", Some(offset(target, bias)), None, feed);
        self.summary.cut_moves += 1;
        self.summary.cut_distance += self.position.distance(target);
        self.position = target;
    }

    /// Skip to the start of `path`, then cut along the rest of it.
    pub fn emit_path(&mut self, path: &Path) {
        self.summary.paths += 1;
        let mut points = path.iter();
        if let Some(start) = points.next() {
            self.skip(start);
        }
        for point in points {
            self.cut(point);
        }
    }

    /// Plan and emit every path remaining in `tour`.
    ///
    /// # Errors
    ///
    /// Propagates [`PipelineError::TourInvariant`] from the planner.
    pub fn emit_tour(&mut self, tour: &mut Tour) -> Result<(), PipelineError> {
        while let Some(path) = tour.next_path()? {
            self.emit_path(&path);
        }
        Ok(())
    }

    /// End the program: raise and park, stop the spindle, return to the
    /// origin without backlash bias, and return the program text.
    #[must_use]
    pub fn finish(mut self) -> String {
        self.tool_up();
        let (code, feed) = (self.config.skip_motion.code(), self.config.feed_skip);
        self.motion(code, None, Some(self.config.z_park), feed);
        let _ = writeln!(self.out, "M5");
        self.bias = Bias::default();
        self.motion(code, Some(Point::ORIGIN), None, feed);
        self.position = Point::ORIGIN;
        let _ = writeln!(self.out, "M30");
        self.out
    }

    /// Backlash bias for a move from the current position to `target`.
    fn bias_toward(&self, target: Point) -> Bias {
        Bias {
            x: axis_bias(
                self.position.x,
                target.x,
                self.config.backlash_x / 2.0,
                self.bias.x,
            ),
            y: axis_bias(
                self.position.y,
                target.y,
                self.config.backlash_y / 2.0,
                self.bias.y,
            ),
        }
    }

    fn tool_up(&mut self) {
        if self.tool == ToolState::Down {
            self.raise();
            self.tool = ToolState::Up;
        }
    }

    fn tool_down(&mut self) {
        if self.tool == ToolState::Up {
            let code = self.config.skip_motion.code();
            self.motion(code, None, Some(self.config.z_clear), self.config.feed_skip);
            self.motion(
                "G1",
                None,
                Some(self.config.z_cut),
                self.config.effective_feed_down(),
            );
            self.tool = ToolState::Down;
        }
    }

    /// Lift to clearance height, then to skip height.
    fn raise(&mut self) {
        self.motion(
            "G1",
            None,
            Some(self.config.z_clear),
            self.config.effective_feed_up(),
        );
        let code = self.config.skip_motion.code();
        self.motion(code, None, Some(self.config.z_skip), self.config.feed_skip);
    }

    /// Write one motion line with only the tokens whose value changed.
    ///
    /// `xy` is in machine space with bias already applied; the sign flag
    /// and quantization are applied here.
    fn motion(&mut self, code: &str, xy: Option<Point>, z: Option<f64>, feed: u32) {
        let sign = if self.config.negate { -1.0 } else { 1.0 };
        let (steps, places) = (self.config.steps, self.config.places);
        let coord = |value: f64| format_coord(quantize(value, steps), places);

        let mut tokens = String::new();
        if let Some(point) = xy {
            push_changed(&mut tokens, 'X', coord(point.x * sign), &mut self.written_x);
            push_changed(&mut tokens, 'Y', coord(point.y * sign), &mut self.written_y);
        }
        if let Some(z) = z {
            push_changed(&mut tokens, 'Z', coord(z), &mut self.written_z);
        }
        if tokens.is_empty() {
            return;
        }
        if self.feed != Some(feed) {
            let _ = write!(tokens, " F{feed}");
            self.feed = Some(feed);
        }
        let _ = writeln!(self.out, "{code}{tokens}");
    }
}

/// Append ` <axis><value>` if `value` differs from the last written one.
fn push_changed(tokens: &mut String, axis: char, value: String, written: &mut Option<String>) {
    if written.as_deref() != Some(value.as_str()) {
        let _ = write!(tokens, " {axis}{value}");
        *written = Some(value);
    }
}

/// Bias for one axis: signed half-slack toward the direction of travel,
/// or the previous bias when the axis does not move.
fn axis_bias(from: f64, to: f64, half_slack: f64, previous: f64) -> f64 {
    if to < from {
        -half_slack
    } else if to > from {
        half_slack
    } else {
        previous
    }
}

fn offset(point: Point, bias: Bias) -> Point {
    Point::new(point.x + bias.x, point.y + bias.y)
}

/// Plan `paths` and serialize the whole program.
///
/// The tour starts from the origin, where the program header leaves the
/// head.
///
/// # Errors
///
/// Returns [`ExportError::InvalidConfig`] if `config` fails validation,
/// or [`ExportError::Pipeline`] if tour planning hits an internal
/// invariant violation.
///
/// # Examples
///
/// ```
/// use millpath_export::gcode::{GcodeConfig, to_gcode};
/// use millpath_pipeline::{Path, Point};
///
/// let path = Path::from_points(vec![Point::new(1.0, 1.0), Point::new(2.0, 1.0)]).unwrap();
/// let gcode = to_gcode(vec![path], &GcodeConfig::default()).unwrap();
/// assert!(gcode.starts_with("G90\nG21\n"));
/// assert!(gcode.contains("G0 X1 Y1\n"));
/// assert!(gcode.ends_with("M30\n"));
/// ```
pub fn to_gcode(paths: Vec<Path>, config: &GcodeConfig) -> Result<String, ExportError> {
    config.validate()?;
    let mut emitter = ToolpathEmitter::new(config);
    let mut tour = Tour::new(paths, emitter.position());
    emitter.emit_tour(&mut tour)?;
    let summary = emitter.summary();
    debug!(
        paths = summary.paths,
        cut_moves = summary.cut_moves,
        skip_moves = summary.skip_moves,
        "emitted toolpath"
    );
    Ok(emitter.finish())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    fn p(x: f64, y: f64) -> Point {
        Point::new(x, y)
    }

    const HEADER: &str = "G90\nG21\nG1 Z0.5 F500\nG0 Z5\nM3 S2000\n";

    /// Lines written after the spindle-on line that ends the header.
    fn body(emitter: &ToolpathEmitter) -> Vec<String> {
        emitter
            .out
            .lines()
            .skip_while(|line| !line.starts_with("M3 "))
            .skip(1)
            .map(str::to_owned)
            .collect()
    }

    // --- Formatting ---

    #[test]
    fn format_strips_trailing_zeros() {
        assert_eq!(format_coord(1.25, 3), "1.25");
        assert_eq!(format_coord(1.0, 3), "1");
        assert_eq!(format_coord(-0.05, 3), "-0.05");
        assert_eq!(format_coord(10.0, 0), "10");
        assert_eq!(format_coord(123.456_789, 3), "123.457");
    }

    #[test]
    fn format_negative_zero_is_zero() {
        assert_eq!(format_coord(-0.0, 3), "0");
        assert_eq!(format_coord(-0.000_1, 3), "0");
    }

    #[test]
    fn quantize_snaps_to_step() {
        assert_eq!(quantize(1.234, 10.0), 1.2);
        assert_eq!(quantize(1.26, 10.0), 1.3);
        assert_eq!(quantize(1.234, 0.0), 1.234);
    }

    #[test]
    fn quantize_is_idempotent() {
        for steps in [1.0, 3.0, 40.0, 80.0, 157.48, 1000.0] {
            for i in -200..200 {
                let x = f64::from(i) * 0.173_1;
                let once = quantize(x, steps);
                assert_eq!(quantize(once, steps), once, "x={x} steps={steps}");
            }
        }
    }

    // --- Program bracketing ---

    #[test]
    fn header_raises_and_starts_spindle() {
        let emitter = ToolpathEmitter::new(&GcodeConfig::default());
        assert_eq!(emitter.out, HEADER);
        assert_eq!(emitter.tool(), ToolState::Up);
        assert_eq!(emitter.position(), Point::ORIGIN);
    }

    #[test]
    fn empty_program_is_header_and_footer() {
        let gcode = to_gcode(Vec::new(), &GcodeConfig::default()).unwrap();
        assert_eq!(gcode, format!("{HEADER}G0 Z30\nM5\nM30\n"));
    }

    #[test]
    fn footer_parks_and_returns_home() {
        let mut emitter = ToolpathEmitter::new(&GcodeConfig::default());
        emitter.skip(p(10.0, 0.0));
        emitter.cut(p(20.0, 0.0));
        let gcode = emitter.finish();
        assert!(gcode.ends_with("G1 Z0.5 F500\nG0 Z5\nG0 Z30\nM5\nG0 X0\nM30\n"));
    }

    #[test]
    fn summary_counts_path_motion_only() {
        let mut emitter = ToolpathEmitter::new(&GcodeConfig::default());
        emitter.skip(p(10.0, 0.0));
        emitter.cut(p(20.0, 0.0));
        let summary = emitter.summary().clone();
        assert_eq!(summary.skip_moves, 1);
        assert_eq!(summary.skip_distance, 10.0);
        assert_eq!(summary.cut_moves, 1);
        assert_eq!(summary.cut_distance, 10.0);

        // The return home is written but is not a counted skip.
        let gcode = emitter.finish();
        assert!(gcode.contains("M5\nG0 X0\n"));
    }

    #[test]
    fn footer_removes_bias_at_origin() {
        let config = GcodeConfig {
            backlash_x: 0.2,
            ..GcodeConfig::default()
        };
        let mut emitter = ToolpathEmitter::new(&config);
        emitter.cut(p(10.0, 0.0));
        emitter.cut(p(0.0, 0.0));
        let gcode = emitter.finish();
        assert!(gcode.ends_with("M5\nG0 X0\nM30\n"), "{gcode}");
    }

    // --- Skip and cut ---

    #[test]
    fn skip_to_current_position_is_noop() {
        let mut emitter = ToolpathEmitter::new(&GcodeConfig::default());
        emitter.skip(Point::ORIGIN);
        assert!(body(&emitter).is_empty());
        assert_eq!(emitter.summary().skip_moves, 0);
    }

    #[test]
    fn cut_lowers_tool_once() {
        let mut emitter = ToolpathEmitter::new(&GcodeConfig::default());
        emitter.skip(p(10.0, 10.0));
        emitter.cut(p(20.0, 10.0));
        emitter.cut(p(20.0, 20.0));
        assert_eq!(
            body(&emitter),
            vec![
                "G0 X10 Y10",
                "G0 Z0.5",
                "G1 Z-0.05 F30",
                "G1 X20",
                "G1 Y20",
            ]
        );
        assert_eq!(emitter.tool(), ToolState::Down);
    }

    #[test]
    fn skip_after_cut_raises_tool() {
        let mut emitter = ToolpathEmitter::new(&GcodeConfig::default());
        emitter.cut(p(5.0, 0.0));
        emitter.skip(p(50.0, 50.0));
        assert_eq!(
            body(&emitter),
            vec![
                "G0 Z0.5",
                "G1 Z-0.05 F30",
                "G1 X5",
                "G1 Z0.5 F500",
                "G0 Z5",
                "G0 X50 Y50",
            ]
        );
        assert_eq!(emitter.tool(), ToolState::Up);
    }

    #[test]
    fn feed_written_once_for_consecutive_cuts() {
        let mut emitter = ToolpathEmitter::new(&GcodeConfig::default());
        emitter.cut(p(1.0, 0.0));
        emitter.cut(p(2.0, 0.0));
        emitter.cut(p(3.0, 0.0));
        let text = body(&emitter).join("\n");
        assert_eq!(text.matches("F30").count(), 1);
    }

    #[test]
    fn custom_plunge_and_lift_feeds() {
        let config = GcodeConfig {
            feed_down: 10,
            feed_up: 200,
            ..GcodeConfig::default()
        };
        let mut emitter = ToolpathEmitter::new(&config);
        emitter.cut(p(1.0, 0.0));
        emitter.skip(p(5.0, 5.0));
        assert_eq!(
            body(&emitter),
            vec![
                "G0 Z0.5",
                "G1 Z-0.05 F10",
                "G1 X1 F30",
                "G1 Z0.5 F200",
                "G0 Z5 F500",
                "G0 X5 Y5",
            ]
        );
    }

    #[test]
    fn linear_skip_motion_uses_g1() {
        let config = GcodeConfig {
            skip_motion: SkipMotion::Linear,
            ..GcodeConfig::default()
        };
        let mut emitter = ToolpathEmitter::new(&config);
        emitter.skip(p(3.0, 4.0));
        assert_eq!(body(&emitter), vec!["G1 X3 Y4"]);
    }

    #[test]
    fn negate_mirrors_both_axes() {
        let config = GcodeConfig {
            negate: true,
            ..GcodeConfig::default()
        };
        let mut emitter = ToolpathEmitter::new(&config);
        emitter.skip(p(3.0, 4.0));
        assert_eq!(body(&emitter), vec!["G0 X-3 Y-4"]);
    }

    #[test]
    fn steps_quantize_written_coordinates() {
        let config = GcodeConfig {
            steps: 10.0,
            ..GcodeConfig::default()
        };
        let mut emitter = ToolpathEmitter::new(&config);
        emitter.skip(p(1.234, 5.678));
        // A move that quantizes to the same value writes nothing.
        emitter.skip(p(1.21, 5.71));
        assert_eq!(body(&emitter), vec!["G0 X1.2 Y5.7"]);
        assert_eq!(emitter.summary().skip_moves, 2);
    }

    // --- Backlash ---

    #[test]
    fn axial_reversal_flips_bias_without_correction() {
        let config = GcodeConfig {
            backlash_x: 0.2,
            ..GcodeConfig::default()
        };
        let mut emitter = ToolpathEmitter::new(&config);
        emitter.cut(p(10.0, 0.0));
        emitter.cut(p(0.0, 0.0));
        assert_eq!(
            body(&emitter),
            vec!["G0 Z0.5", "G1 Z-0.05 F30", "G1 X10.1", "G1 X-0.1"]
        );
    }

    #[test]
    fn diagonal_bias_change_inserts_correction() {
        let config = GcodeConfig {
            backlash_x: 0.2,
            backlash_y: 0.2,
            ..GcodeConfig::default()
        };
        let mut emitter = ToolpathEmitter::new(&config);
        emitter.cut(p(10.0, 10.0));
        emitter.cut(p(0.0, 20.0));
        assert_eq!(
            body(&emitter),
            vec![
                // First diagonal move: bias goes 0 -> +0.1 on both axes.
                "G1 X0.1 Y0.1 F30",
                "G0 Z0.5 F500",
                "G1 Z-0.05 F30",
                "G1 X10.1 Y10.1",
                // X reverses: correct in place, then cut.
                "G1 X9.9",
                "G1 X-0.1 Y20.1",
            ]
        );
    }

    #[test]
    fn diagonal_without_bias_change_has_no_correction() {
        let config = GcodeConfig {
            backlash_x: 0.2,
            backlash_y: 0.2,
            ..GcodeConfig::default()
        };
        let mut emitter = ToolpathEmitter::new(&config);
        emitter.skip(p(1.0, 1.0));
        emitter.cut(p(5.0, 5.0));
        assert_eq!(
            body(&emitter),
            vec!["G0 X1.1 Y1.1", "G0 Z0.5", "G1 Z-0.05 F30", "G1 X5.1 Y5.1"]
        );
    }

    #[test]
    fn bias_holds_on_stationary_axis() {
        let config = GcodeConfig {
            backlash_y: 0.4,
            ..GcodeConfig::default()
        };
        let mut emitter = ToolpathEmitter::new(&config);
        emitter.skip(p(0.0, 10.0));
        emitter.cut(p(5.0, 10.0));
        // Y bias stays +0.2 from the skip, so Y is not rewritten.
        assert_eq!(
            body(&emitter),
            vec!["G0 Y10.2", "G0 Z0.5", "G1 Z-0.05 F30", "G1 X5"]
        );
    }

    // --- Paths and tours ---

    #[test]
    fn emit_path_skips_then_cuts() {
        let mut emitter = ToolpathEmitter::new(&GcodeConfig::default());
        let path = Path::from_points(vec![p(1.0, 1.0), p(2.0, 1.0), p(2.0, 2.0)]).unwrap();
        emitter.emit_path(&path);
        let summary = emitter.summary();
        assert_eq!(summary.paths, 1);
        assert_eq!(summary.skip_moves, 1);
        assert_eq!(summary.cut_moves, 2);
        assert!((summary.cut_distance - 2.0).abs() < 1e-12);
    }

    #[test]
    fn square_loop_from_origin_needs_no_skip() {
        let square = Path::from_points(vec![
            p(0.0, 0.0),
            p(10.0, 0.0),
            p(10.0, 10.0),
            p(0.0, 10.0),
            p(0.0, 0.0),
        ])
        .unwrap();
        let mut emitter = ToolpathEmitter::new(&GcodeConfig::default());
        let mut tour = Tour::new(vec![square], emitter.position());
        emitter.emit_tour(&mut tour).unwrap();
        assert_eq!(emitter.summary().skip_moves, 0);
        assert_eq!(emitter.summary().cut_moves, 4);
        assert_eq!(emitter.position(), Point::ORIGIN);
    }

    #[test]
    fn invalid_config_rejected() {
        let config = GcodeConfig {
            backlash_x: -1.0,
            ..GcodeConfig::default()
        };
        assert!(matches!(
            to_gcode(Vec::new(), &config),
            Err(ExportError::InvalidConfig(_))
        ));
        let config = GcodeConfig {
            z_park: f64::NAN,
            ..GcodeConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn config_json_round_trip_keeps_defaults() {
        let config: GcodeConfig =
            serde_json::from_str(r#"{"feed_cut":60,"skip_motion":"Linear"}"#).unwrap();
        assert_eq!(config.feed_cut, 60);
        assert_eq!(config.skip_motion, SkipMotion::Linear);
        assert_eq!(config.feed_skip, GcodeConfig::DEFAULT_FEED_SKIP);
    }
}
