use chrono::{DateTime, Utc};
use std::path::Path;
use tokio::fs;
use tracing::{debug, info, warn};

use super::record::{strip_tag, RunOutcome};
use crate::errors::{LogError, ParseError};

/// Optional restriction of which parsed outcomes are returned
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseWindow {
    /// Drop outcomes stamped before this instant
    pub since: Option<DateTime<Utc>>,
    /// Keep only the newest `last` outcomes (by position in the log)
    pub last: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedLine {
    pub line_number: usize,
    pub error: ParseError,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseReport {
    pub outcomes: Vec<RunOutcome>,
    /// Non-blank lines without the status tag
    pub ignored: usize,
    /// Tagged lines that failed to parse
    pub malformed: Vec<MalformedLine>,
    /// Parsed outcomes dropped by the window
    pub outside_window: usize,
}

impl ParseReport {
    pub fn skipped(&self) -> usize {
        self.ignored + self.malformed.len()
    }
}

/// Parse every status record in `content`.
///
/// Accepts bare records and records behind a logging prefix such as
/// `2024-12-02 13:32:34,000 - INFO - FINAL_STATUS | ...`. Bad lines are
/// counted, never fatal.
pub fn parse_log(content: &str, window: &ParseWindow) -> ParseReport {
    parse_lines(content.lines().map(Ok), window)
}

/// Same as [`parse_log`] for raw file bytes; each line is decoded on its own
/// so a line with invalid UTF-8 is counted as malformed.
pub fn parse_log_bytes(content: &[u8], window: &ParseWindow) -> ParseReport {
    let lines = content.split(|b| *b == b'\n').map(|line| {
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        std::str::from_utf8(line).map_err(|e| ParseError::InvalidEncoding {
            offset: e.valid_up_to(),
        })
    });
    parse_lines(lines, window)
}

fn parse_lines<'a, I>(lines: I, window: &ParseWindow) -> ParseReport
where
    I: Iterator<Item = Result<&'a str, ParseError>>,
{
    let mut report = ParseReport::default();

    for (index, line) in lines.enumerate() {
        let line_number = index + 1;
        let line = match line {
            Ok(line) => line.trim(),
            Err(error) => {
                warn!("Line {}: Unreadable status entry ({})", line_number, error);
                report.malformed.push(MalformedLine { line_number, error });
                continue;
            }
        };
        if line.is_empty() {
            continue;
        }

        let Some(record) = extract_record(line) else {
            debug!("Line {}: No status entry found.", line_number);
            report.ignored += 1;
            continue;
        };

        match RunOutcome::from_line(record) {
            Ok(outcome) => report.outcomes.push(outcome),
            Err(error) => {
                warn!("Line {}: Malformed status entry ({}): {}", line_number, error, record);
                report.malformed.push(MalformedLine { line_number, error });
            }
        }
    }

    if let Some(since) = window.since {
        let before = report.outcomes.len();
        report.outcomes.retain(|o| o.timestamp >= since);
        report.outside_window += before - report.outcomes.len();
    }
    if let Some(last) = window.last {
        let excess = report.outcomes.len().saturating_sub(last);
        report.outcomes = report.outcomes.split_off(excess);
        report.outside_window += excess;
    }

    report
}

/// Read and parse the status log at `path`
pub async fn read_log(path: &Path, window: &ParseWindow) -> Result<ParseReport, LogError> {
    if !path.exists() {
        return Err(LogError::Missing {
            path: path.to_path_buf(),
        });
    }

    let content = fs::read(path).await.map_err(|source| LogError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let report = parse_log_bytes(&content, window);
    info!(
        "Parsed {} status entries from {} ({} ignored, {} malformed, {} outside window)",
        report.outcomes.len(),
        path.display(),
        report.ignored,
        report.malformed.len(),
        report.outside_window
    );
    Ok(report)
}

fn extract_record(line: &str) -> Option<&str> {
    if strip_tag(line).is_some() {
        return Some(line);
    }

    let mut parts = line.splitn(3, " - ");
    let (_, _, message) = (parts.next()?, parts.next()?, parts.next()?);
    let message = message.trim();
    strip_tag(message).map(|_| message)
}
