//! Edit decision list decoding
//!
//! An EDL sidecar shares the media file's base name with an `.edl`
//! extension. Each line is `start [end] action`, whitespace separated:
//!
//! ```text
//! 0.0     85.2    3
//! 1290.5  1380.0  0
//! 640.0   2
//! ```
//!
//! # Example
//!
//! ```rust
//! use jellybridge_core::edl::{get_outro, EdlParser};
//!
//! let edl = EdlParser::parse("100 200 0\n");
//! assert_eq!(edl.len(), 1);
//! assert_eq!(get_outro(&edl, 201), 101);
//! ```

use crate::error::{Error, Result};
use crate::host::MediaFs;
use crate::types::{EdlAction, EdlInterval};
use tracing::{debug, warn};

/// Maximum distance in seconds between an interval end and the item end
/// for the interval to count as the outro
pub const OUTRO_END_TOLERANCE: i64 = 2;

/// EDL parser
pub struct EdlParser;

impl EdlParser {
    /// Parse EDL text into intervals in file order.
    ///
    /// Lines with an unexpected shape are dropped with a warning.
    pub fn parse(input: &str) -> Vec<EdlInterval> {
        let mut intervals = Vec::new();

        for (index, line) in input.lines().enumerate() {
            match Self::parse_line(index + 1, line) {
                Ok(Some(interval)) => intervals.push(interval),
                Ok(None) => {}
                Err(e) => warn!(error = %e, "Invalid edl line"),
            }
        }

        intervals
    }

    /// Parse a single line. Blank lines yield `Ok(None)`.
    pub fn parse_line(line_no: usize, line: &str) -> Result<Option<EdlInterval>> {
        let fields: Vec<&str> = line.split_whitespace().collect();

        match fields.as_slice() {
            [] => Ok(None),
            [start, action] => {
                let start = parse_seconds(line_no, start)?;
                let action = parse_action(line_no, action)?;
                Ok(Some(EdlInterval::point(start, action)))
            }
            [start, end, action] => {
                let start = parse_seconds(line_no, start)?;
                let end = parse_seconds(line_no, end)?;
                let action = parse_action(line_no, action)?;

                if start > end {
                    return Err(Error::InvalidEdlLine {
                        line: line_no,
                        reason: format!("start {} after end {}", start, end),
                    });
                }

                Ok(Some(EdlInterval::range(start, end, action)))
            }
            other => Err(Error::InvalidEdlLine {
                line: line_no,
                reason: format!("expected 2 or 3 fields, found {}", other.len()),
            }),
        }
    }
}

fn parse_seconds(line_no: usize, token: &str) -> Result<f64> {
    let value: f64 = token.parse().map_err(|_| Error::InvalidEdlLine {
        line: line_no,
        reason: format!("invalid time '{}'", token),
    })?;

    if !value.is_finite() {
        return Err(Error::InvalidEdlLine {
            line: line_no,
            reason: format!("non-finite time '{}'", token),
        });
    }

    Ok(value)
}

fn parse_action(line_no: usize, token: &str) -> Result<EdlAction> {
    token
        .parse::<i32>()
        .map(EdlAction::from)
        .map_err(|_| Error::InvalidEdlLine {
            line: line_no,
            reason: format!("invalid action '{}'", token),
        })
}

/// Sidecar path for a media path: the extension is swapped for `.edl`.
///
/// Works on local paths and URLs alike; a dot inside a directory component
/// or a leading dot of the file name is not treated as an extension.
pub fn edl_path_for(media_path: &str) -> String {
    let name_start = media_path
        .rfind(|c: char| c == '/' || c == '\\')
        .map(|i| i + 1)
        .unwrap_or(0);
    let name = &media_path[name_start..];
    let stem_len = name.trim_start_matches('.').len();
    let leading_dots = name.len() - stem_len;

    match name[leading_dots..].rfind('.') {
        Some(dot) => format!("{}.edl", &media_path[..name_start + leading_dots + dot]),
        None => format!("{}.edl", media_path),
    }
}

/// Load the sidecar EDL for a media file.
///
/// A missing or unreadable sidecar yields no markers.
pub async fn load_edl(fs: &dyn MediaFs, media_path: &str) -> Vec<EdlInterval> {
    let edl_file = edl_path_for(media_path);

    match fs.read_to_string_if_exists(&edl_file).await {
        Ok(Some(text)) => {
            let edl = EdlParser::parse(&text);
            debug!(file = %edl_file, markers = edl.len(), "EDL loaded");
            edl
        }
        Ok(None) => Vec::new(),
        Err(e) => {
            warn!(file = %edl_file, error = %e, "Failed to read edl file");
            Vec::new()
        }
    }
}

/// Seconds before the end at which the outro starts, or 0 when no interval
/// ends within [`OUTRO_END_TOLERANCE`] of `total_time` with an outro action.
pub fn get_outro(edl: &[EdlInterval], total_time: i64) -> i64 {
    edl.iter()
        .find_map(|interval| {
            let end = interval.end? as i64;
            if (total_time - end).abs() < OUTRO_END_TOLERANCE && interval.action.is_outro() {
                Some(total_time - interval.start as i64)
            } else {
                None
            }
        })
        .unwrap_or(0)
}
