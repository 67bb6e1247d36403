//! Draw-record reader: parse the flattened drawing's text records.
//!
//! The flattening step (Ghostscript with a redefined `stroke`) prints one
//! record per line: a one-character opcode followed by up to two integers
//! separated by an optional comma.
//!
//! | Opcode | Meaning |
//! |--------|---------|
//! | `M`    | move to a new sub-figure start |
//! | `L`    | line to a point |
//! | `Z`    | close the sub-figure back to its start |
//! | `W`    | set the current stroke width |
//! | `X`    | end of page |
//!
//! The device prints its axes swapped relative to the machine bed: the
//! first number of a coordinate record is the Y value and the second is
//! the X value. Values stay in source units here; conversion to
//! millimetres happens in [`collect`](crate::collect).

/// A typed draw record in source units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DrawRecord {
    /// Start a new sub-figure at `(x, y)`.
    Move {
        /// Horizontal source coordinate.
        x: f64,
        /// Vertical source coordinate.
        y: f64,
    },
    /// Draw a line from the current point to `(x, y)`.
    Line {
        /// Horizontal source coordinate.
        x: f64,
        /// Vertical source coordinate.
        y: f64,
    },
    /// Close the current sub-figure back to its start.
    Close,
    /// Set the current stroke width (source units).
    SetWidth(f64),
    /// Stop reading further records.
    EndOfPage,
}

/// A record line that could not be understood.
///
/// Always recoverable: callers log it and continue with the next line.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordError {
    /// The opcode character is not one of `M`, `L`, `Z`, `W`, `X`.
    #[error("line {line}: unrecognized record opcode {opcode:?}")]
    UnknownOpcode {
        /// One-based line number.
        line: usize,
        /// The offending opcode.
        opcode: char,
    },

    /// The opcode is known but its numbers are missing or unparseable.
    #[error("line {line}: malformed record {text:?}")]
    Malformed {
        /// One-based line number.
        line: usize,
        /// The trimmed line text.
        text: String,
    },
}

/// Parse every record in `text`, one per line.
///
/// Blank lines are skipped. Each remaining line yields either a record
/// or a [`RecordError`]; parsing never stops early, so `EndOfPage`
/// handling is left to the consumer.
pub fn parse_records(text: &str) -> impl Iterator<Item = Result<DrawRecord, RecordError>> + '_ {
    text.lines()
        .enumerate()
        .filter_map(|(index, line)| parse_record(index + 1, line))
}

/// Parse a single record line.
///
/// Returns `None` for blank lines.
#[must_use]
pub fn parse_record(line: usize, text: &str) -> Option<Result<DrawRecord, RecordError>> {
    let text = text.trim();
    let mut chars = text.chars();
    let opcode = chars.next()?;
    let rest = chars.as_str();

    let malformed = || RecordError::Malformed {
        line,
        text: text.to_owned(),
    };

    let record = match opcode {
        'M' | 'L' => match numbers(rest).as_deref() {
            Some([y, x, ..]) => {
                let (x, y) = (*x, *y);
                if opcode == 'M' {
                    Ok(DrawRecord::Move { x, y })
                } else {
                    Ok(DrawRecord::Line { x, y })
                }
            }
            _ => Err(malformed()),
        },
        'W' => match numbers(rest).as_deref() {
            Some([width, ..]) => Ok(DrawRecord::SetWidth(*width)),
            _ => Err(malformed()),
        },
        'Z' => Ok(DrawRecord::Close),
        'X' => Ok(DrawRecord::EndOfPage),
        other => Err(RecordError::UnknownOpcode {
            line,
            opcode: other,
        }),
    };
    Some(record)
}

/// Split the operand text on commas and whitespace and parse each field.
///
/// Returns `None` if any field fails to parse or is not finite.
fn numbers(rest: &str) -> Option<Vec<f64>> {
    rest.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|field| !field.is_empty())
        .map(|field| field.parse::<f64>().ok().filter(|value| value.is_finite()))
        .collect()
}
