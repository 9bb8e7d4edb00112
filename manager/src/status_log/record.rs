use chrono::{DateTime, NaiveDateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::constants::status_log::{
    DELIMITER, FIELD_COUNT, TAG, TIMESTAMP_FORMAT, TOTAL_SUFFIX,
};
use crate::errors::ParseError;

const UNKNOWN_FIELD: &str = "unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RunStatus {
    Success,
    Failure,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Success => "SUCCESS",
            RunStatus::Failure => "FAILURE",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RunStatus::Success)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunStatus {
    type Err = ParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if value.eq_ignore_ascii_case("SUCCESS") {
            Ok(RunStatus::Success)
        } else if value.eq_ignore_ascii_case("FAILURE") {
            Ok(RunStatus::Failure)
        } else {
            Err(ParseError::InvalidStatus {
                value: value.to_string(),
            })
        }
    }
}

/// Result of one server's snapshot cycle, persisted as one status line:
///
/// `FINAL_STATUS | <script> | <server> | <status> | <host> | <YYYY-MM-DD HH:MM:SS> | <snapshot> | <n> snapshots exist`
///
/// Outcomes built through [`RunOutcome::new`] always serialize and parse back
/// to an equal value: text fields are stripped of `|` and line breaks, and the
/// timestamp is truncated to whole seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunOutcome {
    pub script: String,
    pub server_name: String,
    pub status: RunStatus,
    pub hostname: String,
    pub timestamp: DateTime<Utc>,
    pub snapshot_name: Option<String>,
    pub total_snapshots: usize,
}

impl RunOutcome {
    pub fn new(
        script: &str,
        server_name: &str,
        status: RunStatus,
        hostname: &str,
        timestamp: DateTime<Utc>,
        snapshot_name: Option<&str>,
        total_snapshots: usize,
    ) -> Self {
        Self {
            script: required_field(script),
            server_name: required_field(server_name),
            status,
            hostname: required_field(hostname),
            timestamp: timestamp.trunc_subsecs(0),
            snapshot_name: snapshot_name.map(sanitize).filter(|name| !name.is_empty()),
            total_snapshots,
        }
    }

    /// True when the outcome survives a write/parse round trip unchanged
    pub fn is_valid(&self) -> bool {
        let clean = |value: &str| !value.is_empty() && sanitize(value) == value;
        clean(&self.script)
            && clean(&self.server_name)
            && clean(&self.hostname)
            && self.snapshot_name.as_deref().map_or(true, clean)
            && self.timestamp.trunc_subsecs(0) == self.timestamp
    }

    pub fn to_line(&self) -> String {
        let total = format!("{}{}", self.total_snapshots, TOTAL_SUFFIX);
        let timestamp = self.timestamp.format(TIMESTAMP_FORMAT).to_string();
        [
            TAG,
            &self.script,
            &self.server_name,
            self.status.as_str(),
            &self.hostname,
            &timestamp,
            self.snapshot_name.as_deref().unwrap_or(""),
            &total,
        ]
        .join(DELIMITER)
    }

    /// Parse a status record. `line` must start with the tag; surrounding
    /// logger prefixes are the parser's concern.
    pub fn from_line(line: &str) -> Result<Self, ParseError> {
        let body = strip_tag(line.trim()).ok_or(ParseError::UnknownTag { tag: TAG })?;

        let fields: Vec<&str> = body.split(DELIMITER.trim()).map(str::trim).collect();
        if fields.len() != FIELD_COUNT - 1 {
            return Err(ParseError::FieldCount {
                expected: FIELD_COUNT,
                found: fields.len() + 1,
            });
        }

        let non_empty = |value: &str, field: &'static str| {
            if value.is_empty() {
                Err(ParseError::EmptyField { field })
            } else {
                Ok(value.to_string())
            }
        };

        let script = non_empty(fields[0], "script")?;
        let server_name = non_empty(fields[1], "server")?;
        let status = fields[2].parse::<RunStatus>()?;
        let hostname = non_empty(fields[3], "hostname")?;
        let timestamp = NaiveDateTime::parse_from_str(fields[4], TIMESTAMP_FORMAT)
            .map_err(|_| ParseError::InvalidTimestamp {
                value: fields[4].to_string(),
            })?
            .and_utc();
        let snapshot_name = Some(fields[5])
            .filter(|name| !name.is_empty())
            .map(str::to_string);
        let total_snapshots = parse_total(fields[6])?;

        Ok(Self {
            script,
            server_name,
            status,
            hostname,
            timestamp,
            snapshot_name,
            total_snapshots,
        })
    }
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_line())
    }
}

impl FromStr for RunOutcome {
    type Err = ParseError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        Self::from_line(line)
    }
}

/// Body after `FINAL_STATUS<ws>|`, matched case-insensitively
pub(crate) fn strip_tag(line: &str) -> Option<&str> {
    let head = line.get(..TAG.len())?;
    if !head.eq_ignore_ascii_case(TAG) {
        return None;
    }
    line[TAG.len()..].trim_start().strip_prefix('|')
}

fn parse_total(value: &str) -> Result<usize, ParseError> {
    let number = value.strip_suffix(TOTAL_SUFFIX.trim_start()).unwrap_or(value);
    number.trim().parse().map_err(|_| ParseError::InvalidTotal {
        value: value.to_string(),
    })
}

fn sanitize(value: &str) -> String {
    value
        .chars()
        .map(|c| match c {
            '|' => '/',
            '\n' | '\r' | '\t' => ' ',
            other => other,
        })
        .collect::<String>()
        .trim()
        .to_string()
}

fn required_field(value: &str) -> String {
    let clean = sanitize(value);
    if clean.is_empty() {
        UNKNOWN_FIELD.to_string()
    } else {
        clean
    }
}
