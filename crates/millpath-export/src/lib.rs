//! millpath-export: Pure format serializers (sans-IO)
//!
//! Converts planned paths into output formats: G-code for the mill and
//! an SVG preview of the tour.

pub mod error;
pub mod gcode;
pub mod svg;

pub use error::ExportError;
pub use gcode::{
    GcodeConfig, SkipMotion, ToolState, ToolpathEmitter, ToolpathSummary, format_coord, quantize,
    to_gcode,
};
pub use svg::{SvgMetadata, build_path_data, to_preview_svg};
