//! millpath: convert flattened drawing records into milling G-code.
//!
//! Reads the record stream printed by the flattening step, joins the
//! strokes into paths, orders them with a greedy tour, and writes a G-code
//! program for PCB isolation milling.
//!
//! # Usage
//!
//! ```text
//! millpath [OPTIONS] [INPUT] [OUTPUT]
//! gs -q -sDEVICE=eps2write ... board.ps | millpath --width 0.3 - board.nc
//! ```
//!
//! `INPUT` and `OUTPUT` default to stdin and stdout; `-` names them
//! explicitly.

#![allow(clippy::print_stderr)]

use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use millpath_export::{GcodeConfig, SkipMotion, SvgMetadata, ToolpathEmitter, to_preview_svg};
use millpath_pipeline::{Pipeline, PipelineConfig};

/// Convert flattened drawing records into G-code for isolation milling.
///
/// Feed rates are in mm/min, heights in mm, spindle speed in rpm.
#[derive(Parser, Debug)]
#[command(name = "millpath", version)]
struct Cli {
    /// Record file to read (`-` for stdin).
    #[arg(value_name = "INPUT", conflicts_with = "in_file")]
    input: Option<String>,

    /// G-code file to write (`-` for stdout).
    #[arg(value_name = "OUTPUT", conflicts_with = "out_file")]
    output: Option<String>,

    /// Record file to read (`-` for stdin).
    #[arg(short = 'i', long = "in-file", value_name = "PATH")]
    in_file: Option<String>,

    /// G-code file to write (`-` for stdout).
    #[arg(short = 'o', long = "out-file", value_name = "PATH")]
    out_file: Option<String>,

    /// Cutting feed rate.
    #[arg(short = 'f', long = "f-cut", default_value_t = GcodeConfig::DEFAULT_FEED_CUT)]
    feed_cut: u32,

    /// Plunge feed rate (0 uses the cutting feed).
    #[arg(long = "f-down", default_value_t = 0)]
    feed_down: u32,

    /// Lift feed rate (0 uses the skip feed).
    #[arg(long = "f-up", default_value_t = 0)]
    feed_up: u32,

    /// Feed rate for moves with the tool raised.
    #[arg(long = "f-skip", default_value_t = GcodeConfig::DEFAULT_FEED_SKIP)]
    feed_skip: u32,

    /// Spindle speed.
    #[arg(short = 's', long, default_value_t = GcodeConfig::DEFAULT_SPEED)]
    speed: u32,

    /// Cut depth.
    #[arg(long, default_value_t = GcodeConfig::DEFAULT_Z_CUT, allow_negative_numbers = true)]
    z_cut: f64,

    /// Safe height for skip moves.
    #[arg(long, default_value_t = GcodeConfig::DEFAULT_Z_SKIP, allow_negative_numbers = true)]
    z_skip: f64,

    /// Height just above the work, passed on the way down and up.
    #[arg(long, default_value_t = GcodeConfig::DEFAULT_Z_CLEAR, allow_negative_numbers = true)]
    z_clear: f64,

    /// Height the tool is parked at when the program ends.
    #[arg(long, default_value_t = GcodeConfig::DEFAULT_Z_PARK, allow_negative_numbers = true)]
    z_park: f64,

    /// Decimal places written for coordinates.
    #[arg(long, default_value_t = GcodeConfig::DEFAULT_PLACES)]
    places: usize,

    /// Steps per millimetre to quantize coordinates to (0 disables).
    #[arg(long, default_value_t = 0.0)]
    steps: f64,

    /// X axis backlash in mm.
    #[arg(long, default_value_t = 0.0)]
    backlash_x: f64,

    /// Y axis backlash in mm.
    #[arg(long, default_value_t = 0.0)]
    backlash_y: f64,

    /// Use G1 at the skip feed instead of G0 for skip moves.
    #[arg(long)]
    g1: bool,

    /// Negate X and Y (mill from the other side of the board).
    #[arg(long)]
    neg: bool,

    /// Scale factor applied to every source coordinate.
    #[arg(short = 'S', long, default_value_t = PipelineConfig::DEFAULT_SCALE)]
    scale: f64,

    /// Only mill strokes drawn at this width in mm.
    #[arg(long)]
    width: Option<f64>,

    /// Both configurations as a JSON object `{"pipeline": ..., "gcode": ...}`.
    ///
    /// When provided, all other configuration flags are ignored. Missing
    /// fields take their defaults.
    #[arg(long)]
    config_json: Option<String>,

    /// Write an SVG preview of the planned tour to this file.
    #[arg(long)]
    svg: Option<PathBuf>,

    /// Enable debug logging (`RUST_LOG` takes precedence).
    #[arg(short = 'v', long = "debug", alias = "verbose")]
    debug: bool,
}

/// Shape of the `--config-json` document.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    pipeline: PipelineConfig,
    gcode: GcodeConfig,
}

/// Build the pipeline and G-code configurations from CLI arguments.
///
/// If `--config-json` is provided, the JSON is parsed directly and all
/// individual parameter flags are ignored.
fn configs_from_cli(cli: &Cli) -> Result<(PipelineConfig, GcodeConfig)> {
    if let Some(ref json) = cli.config_json {
        let file: ConfigFile = serde_json::from_str(json).context("parsing --config-json")?;
        return Ok((file.pipeline, file.gcode));
    }

    let pipeline = PipelineConfig {
        scale: cli.scale,
        width: cli.width,
    };
    let gcode = GcodeConfig {
        feed_cut: cli.feed_cut,
        feed_down: cli.feed_down,
        feed_up: cli.feed_up,
        feed_skip: cli.feed_skip,
        speed: cli.speed,
        z_cut: cli.z_cut,
        z_skip: cli.z_skip,
        z_clear: cli.z_clear,
        z_park: cli.z_park,
        places: cli.places,
        steps: cli.steps,
        backlash_x: cli.backlash_x,
        backlash_y: cli.backlash_y,
        negate: cli.neg,
        skip_motion: if cli.g1 {
            SkipMotion::Linear
        } else {
            SkipMotion::Rapid
        },
    };
    Ok((pipeline, gcode))
}

/// Install a stderr log subscriber. `RUST_LOG` overrides the level
/// chosen by `--debug`.
fn init_logging(debug: bool) {
    let default = if debug { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

/// `None` and `-` both select the standard stream.
fn named_file(name: Option<&str>) -> Option<&str> {
    name.filter(|name| *name != "-")
}

fn read_input(name: Option<&str>) -> Result<String> {
    match named_file(name) {
        Some(path) => fs::read_to_string(path).with_context(|| format!("reading {path}")),
        None => {
            let mut text = String::new();
            io::stdin()
                .read_to_string(&mut text)
                .context("reading records from stdin")?;
            Ok(text)
        }
    }
}

fn write_output(name: Option<&str>, program: &str) -> Result<()> {
    match named_file(name) {
        Some(path) => fs::write(path, program).with_context(|| format!("writing {path}")),
        None => {
            let mut stdout = io::stdout().lock();
            stdout
                .write_all(program.as_bytes())
                .and_then(|()| stdout.flush())
                .context("writing G-code to stdout")
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let (pipeline_config, gcode_config) = configs_from_cli(cli)?;
    gcode_config.validate()?;

    let input = cli.in_file.as_deref().or(cli.input.as_deref());
    let output = cli.out_file.as_deref().or(cli.output.as_deref());
    let records = read_input(input)?;

    let collected = Pipeline::new(&records, pipeline_config)?.collect();
    debug!(segments = collected.segments().len(), "line collection done");
    let built = collected.build();
    info!(paths = built.paths().len(), "path building done");

    let mut emitter = ToolpathEmitter::new(&gcode_config);
    let mut tour = built.into_tour(emitter.position());
    let mut planned = Vec::new();
    while let Some(path) = tour.next_path()? {
        emitter.emit_path(&path);
        if cli.svg.is_some() {
            planned.push(path);
        }
    }

    let summary = emitter.summary().clone();
    info!(
        paths = summary.paths,
        cut_moves = summary.cut_moves,
        skip_moves = summary.skip_moves,
        cut_mm = summary.cut_distance,
        skip_mm = summary.skip_distance,
        "toolpath emitted"
    );
    write_output(output, &emitter.finish())?;

    if let Some(ref svg_path) = cli.svg {
        let description = serde_json::to_string(&gcode_config)?;
        let metadata = SvgMetadata {
            title: named_file(input),
            description: Some(&description),
        };
        let svg = to_preview_svg(&planned, &metadata);
        fs::write(svg_path, &svg)
            .with_context(|| format!("writing SVG to {}", svg_path.display()))?;
        debug!(path = %svg_path.display(), bytes = svg.len(), "SVG preview written");
    }

    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.debug);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("millpath: {e:#}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("millpath").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn defaults_match_library_defaults() {
        let (pipeline, gcode) = configs_from_cli(&parse(&[])).unwrap();
        assert_eq!(pipeline, PipelineConfig::default());
        assert_eq!(gcode, GcodeConfig::default());
    }

    #[test]
    fn flags_map_onto_configs() {
        let cli = parse(&[
            "-f",
            "40",
            "--f-down",
            "10",
            "-s",
            "12000",
            "--z-cut",
            "-0.1",
            "--places",
            "4",
            "--steps",
            "80",
            "--backlash-x",
            "0.2",
            "--g1",
            "--neg",
            "-S",
            "2",
            "--width",
            "0.3",
        ]);
        let (pipeline, gcode) = configs_from_cli(&cli).unwrap();
        assert_eq!(pipeline.scale, 2.0);
        assert_eq!(pipeline.width, Some(0.3));
        assert_eq!(gcode.feed_cut, 40);
        assert_eq!(gcode.effective_feed_down(), 10);
        assert_eq!(gcode.speed, 12_000);
        assert_eq!(gcode.z_cut, -0.1);
        assert_eq!(gcode.places, 4);
        assert_eq!(gcode.steps, 80.0);
        assert_eq!(gcode.backlash_x, 0.2);
        assert_eq!(gcode.skip_motion, SkipMotion::Linear);
        assert!(gcode.negate);
    }

    #[test]
    fn config_json_overrides_flags() {
        let cli = parse(&[
            "-f",
            "99",
            "--config-json",
            r#"{"pipeline": {"width": 0.5}, "gcode": {"speed": 8000}}"#,
        ]);
        let (pipeline, gcode) = configs_from_cli(&cli).unwrap();
        assert_eq!(pipeline.width, Some(0.5));
        assert_eq!(gcode.speed, 8000);
        assert_eq!(gcode.feed_cut, GcodeConfig::DEFAULT_FEED_CUT);
    }

    #[test]
    fn config_json_rejects_garbage() {
        let cli = parse(&["--config-json", "{not json"]);
        assert!(configs_from_cli(&cli).is_err());
    }

    #[test]
    fn positional_files() {
        let cli = parse(&["board.vec", "board.nc"]);
        assert_eq!(cli.input.as_deref(), Some("board.vec"));
        assert_eq!(cli.output.as_deref(), Some("board.nc"));
    }

    #[test]
    fn positional_conflicts_with_flag() {
        let args = ["millpath", "-i", "a.vec", "b.vec"];
        assert!(Cli::try_parse_from(args).is_err());
    }

    #[test]
    fn dash_selects_standard_stream() {
        assert_eq!(named_file(None), None);
        assert_eq!(named_file(Some("-")), None);
        assert_eq!(named_file(Some("out.nc")), Some("out.nc"));
    }

    #[test]
    fn verbose_alias() {
        assert!(parse(&["-v"]).debug);
        assert!(parse(&["--debug"]).debug);
        assert!(parse(&["--verbose"]).debug);
    }
}
