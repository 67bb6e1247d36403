//! SVG export serializer: preview of a planned tour.
//!
//! Renders planned paths with the [`svg`] crate so a program can be
//! checked by eye before it reaches the machine. Each cut path becomes
//! a solid `<path>`; all skip moves (from the origin, between paths,
//! and back to the origin) are collected into one dashed `<path>`.
//!
//! The Y axis is flipped so the preview reads like the machine bed, with
//! +Y pointing up. The `viewBox` is fitted to the drawing plus the
//! origin, in millimetres.
//!
//! This is a pure function with no I/O -- it returns a `String`.

use svg::Document;
use svg::node::Text;
use svg::node::element::path::Data;
use svg::node::element::{Description, Path as SvgPath, Title};

use millpath_pipeline::{Path, Point};

/// Metadata to embed in the SVG document.
///
/// Both fields are optional.  When present, a `<title>` and/or `<desc>`
/// element is emitted immediately after the opening `<svg>` tag.
///
/// Text values are XML-escaped automatically by the `svg` crate.
#[derive(Debug, Clone, Default)]
pub struct SvgMetadata<'a> {
    /// Document title, emitted as `<title>`.
    ///
    /// Typically the input filename.
    pub title: Option<&'a str>,

    /// Document description, emitted as `<desc>`.
    pub description: Option<&'a str>,
}

/// Map a machine point into flipped SVG space.
fn to_svg_space(point: Point) -> (f64, f64) {
    // Subtracting from 0.0 keeps y = 0 from printing as "-0".
    (point.x, 0.0 - point.y)
}

/// Build an SVG path `d` attribute for one cut path.
///
/// Uses `M` for the first point and `L` for the rest, in flipped
/// coordinates.
///
/// # Examples
///
/// ```
/// use millpath_export::build_path_data;
/// use millpath_pipeline::{Path, Point};
///
/// let path = Path::from_points(vec![Point::new(10.0, 20.0), Point::new(30.0, 40.0)]).unwrap();
/// assert_eq!(build_path_data(&path), "M10,-20 L30,-40");
/// ```
#[must_use]
pub fn build_path_data(path: &Path) -> String {
    let mut points = path.iter().map(to_svg_space);
    let Some(first) = points.next() else {
        return String::new();
    };
    let data = points.fold(Data::new().move_to(first), |data, p| data.line_to(p));
    String::from(svg::node::Value::from(data))
}

/// Skip moves implied by visiting `paths` in order from and back to the
/// origin, as `(from, to)` pairs. Zero-length skips are omitted.
fn skip_moves(paths: &[Path]) -> Vec<(Point, Point)> {
    let mut moves = Vec::with_capacity(paths.len() + 1);
    let mut head = Point::ORIGIN;
    for path in paths {
        if path.start() != head {
            moves.push((head, path.start()));
        }
        head = path.end();
    }
    if head != Point::ORIGIN {
        moves.push((head, Point::ORIGIN));
    }
    moves
}

/// Bounding box `(min_x, min_y, max_x, max_y)` of all points and the origin.
fn bounds(paths: &[Path]) -> (f64, f64, f64, f64) {
    paths.iter().flat_map(Path::iter).fold(
        (0.0_f64, 0.0_f64, 0.0_f64, 0.0_f64),
        |(min_x, min_y, max_x, max_y), p| {
            (min_x.min(p.x), min_y.min(p.y), max_x.max(p.x), max_y.max(p.y))
        },
    )
}

/// Serialize a planned tour into an SVG preview.
///
/// `paths` must already be in tour order and orientation, as returned by
/// the planner.
///
/// # Examples
///
/// ```
/// use millpath_export::{SvgMetadata, to_preview_svg};
/// use millpath_pipeline::{Path, Point};
///
/// let path = Path::from_points(vec![Point::new(1.0, 1.0), Point::new(5.0, 1.0)]).unwrap();
/// let metadata = SvgMetadata {
///     title: Some("board.vec"),
///     ..SvgMetadata::default()
/// };
/// let svg = to_preview_svg(&[path], &metadata);
/// assert!(svg.contains("<title>board.vec</title>"));
/// assert!(svg.contains("M1,-1 L5,-1"));
/// ```
#[must_use]
pub fn to_preview_svg(paths: &[Path], metadata: &SvgMetadata<'_>) -> String {
    let (min_x, min_y, max_x, max_y) = bounds(paths);
    let extent = (max_x - min_x).max(max_y - min_y);
    let margin = (extent * 0.05).max(1.0);
    let width = 2.0_f64.mul_add(margin, max_x - min_x);
    let height = 2.0_f64.mul_add(margin, max_y - min_y);
    let stroke_width = (extent / 400.0).max(0.05);

    let mut doc = Document::new()
        .set("width", format!("{width}mm"))
        .set("height", format!("{height}mm"))
        .set(
            "viewBox",
            format!("{} {} {width} {height}", min_x - margin, -max_y - margin),
        );

    // Optional <title> element
    if let Some(title) = metadata.title {
        doc = doc.add(Title::new(title));
    }

    // Optional <desc> element
    if let Some(description) = metadata.description {
        doc = doc.add(Description::new().add(Text::new(description)));
    }

    for path in paths {
        let element = SvgPath::new()
            .set("d", build_path_data(path))
            .set("fill", "none")
            .set("stroke", "black")
            .set("stroke-width", stroke_width)
            .set("stroke-linejoin", "round");
        doc = doc.add(element);
    }

    let skips = skip_moves(paths);
    if !skips.is_empty() {
        let data = skips.iter().fold(Data::new(), |data, &(from, to)| {
            data.move_to(to_svg_space(from)).line_to(to_svg_space(to))
        });
        let element = SvgPath::new()
            .set("d", data)
            .set("fill", "none")
            .set("stroke", "red")
            .set("stroke-width", stroke_width)
            .set("stroke-dasharray", format!("{dash} {dash}", dash = stroke_width * 4.0));
        doc = doc.add(element);
    }

    // The svg crate omits the XML declaration, so we prepend it.
    format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{doc}\n")
}
