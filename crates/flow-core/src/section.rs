//! Managed section inside a user-owned markdown document.
//!
//! The section is delimited by two marker lines. Markers must match a whole
//! line (a trailing `\r` is ignored), so the start marker never matches the end
//! marker even though one is a prefix of the other.

use crate::error::{FlowError, Result};
use crate::io;
use crate::types::{MergeAction, SectionReport};
use std::ops::Range;
use std::path::Path;
use thiserror::Error;

pub const START_MARKER: &str = "## DL Agentic Workflow";
pub const END_MARKER: &str = "## DL Agentic Workflow END";

/// A marker arrangement that the upserter refuses to touch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SentinelViolation {
    #[error("multiple start markers found: {0}")]
    MultipleStart(usize),

    #[error("multiple end markers found: {0}")]
    MultipleEnd(usize),

    #[error("found start marker \"## DL Agentic Workflow\" but no end marker \"## DL Agentic Workflow END\"")]
    MissingEnd,

    #[error("found end marker \"## DL Agentic Workflow END\" but no start marker \"## DL Agentic Workflow\"")]
    MissingStart,

    #[error("end marker \"## DL Agentic Workflow END\" appears before start marker \"## DL Agentic Workflow\"")]
    Inverted,
}

/// Byte span of one marker line: `start` is the first byte of the line and
/// `next` the first byte after its line terminator.
#[derive(Debug, Clone, Copy)]
struct MarkerLine {
    start: usize,
    next: usize,
}

fn marker_lines(text: &str, marker: &str) -> Vec<MarkerLine> {
    let mut found = Vec::new();
    let mut offset = 0;
    for line in text.split_inclusive('\n') {
        let body = line.strip_suffix('\n').unwrap_or(line);
        let body = body.strip_suffix('\r').unwrap_or(body);
        if body == marker {
            found.push(MarkerLine {
                start: offset,
                next: offset + line.len(),
            });
        }
        offset += line.len();
    }
    found
}

/// Locate the region between the markers.
///
/// `Ok(None)` means neither marker is present. The returned range starts right
/// after the start marker's line terminator and ends at the first byte of the
/// end marker's line.
pub fn locate_region(text: &str) -> std::result::Result<Option<Range<usize>>, SentinelViolation> {
    let starts = marker_lines(text, START_MARKER);
    let ends = marker_lines(text, END_MARKER);

    if starts.len() > 1 {
        return Err(SentinelViolation::MultipleStart(starts.len()));
    }
    if ends.len() > 1 {
        return Err(SentinelViolation::MultipleEnd(ends.len()));
    }

    match (starts.first(), ends.first()) {
        (None, None) => Ok(None),
        (Some(_), None) => Err(SentinelViolation::MissingEnd),
        (None, Some(_)) => Err(SentinelViolation::MissingStart),
        (Some(s), Some(e)) if e.start < s.start => Err(SentinelViolation::Inverted),
        (Some(s), Some(e)) => Ok(Some(s.next..e.start)),
    }
}

/// Check the marker invariant without modifying anything.
pub fn validate_sentinels(text: &str) -> std::result::Result<(), SentinelViolation> {
    locate_region(text).map(|_| ())
}

/// Trimmed content of the managed region, or `None` if there is no region.
pub fn read_section(text: &str) -> std::result::Result<Option<&str>, SentinelViolation> {
    Ok(locate_region(text)?.map(|range| text[range].trim()))
}

/// Render a complete section, markers included.
pub fn render_section(content: &str) -> String {
    render_section_with(content, "\n")
}

fn render_section_with(content: &str, eol: &str) -> String {
    format!("{START_MARKER}{eol}{}{eol}{END_MARKER}{eol}", with_eol(content, eol))
}

/// Rewrite every line break in `text` as `eol`.
fn with_eol(text: &str, eol: &str) -> String {
    let lf = text.replace("\r\n", "\n");
    if eol == "\n" {
        lf
    } else {
        lf.replace('\n', eol)
    }
}

/// True when some line of `content` is exactly a marker.
fn contains_marker_line(content: &str) -> bool {
    !marker_lines(content, START_MARKER).is_empty()
        || !marker_lines(content, END_MARKER).is_empty()
}

/// Insert or refresh the managed section in `path`.
///
/// A document that violates the marker invariant, or content that contains a
/// marker line, is reported as [`FlowError::MalformedDocument`] and the
/// document is left unmodified. Replacements keep the line endings of the
/// start marker's line.
pub fn upsert_section(path: &Path, new_content: &str) -> Result<SectionReport> {
    if contains_marker_line(new_content) {
        return Err(FlowError::MalformedDocument {
            path: path.to_path_buf(),
            reason: "section content contains a marker line".to_string(),
        });
    }

    let Some(existing) = io::read_text_if_exists(path)? else {
        io::atomic_write(path, render_section(new_content).as_bytes())?;
        tracing::info!(path = %path.display(), "section created");
        return Ok(SectionReport {
            action: MergeAction::Created,
            section_found: false,
        });
    };

    let region = locate_region(&existing).map_err(|v| FlowError::MalformedDocument {
        path: path.to_path_buf(),
        reason: v.to_string(),
    })?;

    let Some(range) = region else {
        let eol = if existing.contains("\r\n") { "\r\n" } else { "\n" };
        let updated = format!(
            "{}{eol}{}",
            existing.trim_end(),
            render_section_with(new_content, eol)
        );
        io::atomic_write(path, updated.as_bytes())?;
        tracing::info!(path = %path.display(), "section appended");
        return Ok(SectionReport {
            action: MergeAction::Updated,
            section_found: false,
        });
    };

    if with_eol(existing[range.clone()].trim(), "\n") == with_eol(new_content.trim(), "\n") {
        tracing::info!(path = %path.display(), "section unchanged");
        return Ok(SectionReport {
            action: MergeAction::Skipped,
            section_found: true,
        });
    }

    let before = &existing[..range.start];
    let after = &existing[range.end..];
    let eol = if before.ends_with("\r\n") { "\r\n" } else { "\n" };
    let updated = format!("{before}{}{eol}{after}", with_eol(new_content, eol));
    io::atomic_write(path, updated.as_bytes())?;
    tracing::info!(path = %path.display(), "section replaced");

    Ok(SectionReport {
        action: MergeAction::Updated,
        section_found: true,
    })
}
