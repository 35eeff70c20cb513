use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::view_model::format_with_commas;

pub const UNTITLED_FILE: &str = "Untitled";
pub const NO_SUMMARY: &str = "_No summary stored._";
pub const UNKNOWN_DATE: &str = "Unknown date";
pub const AUTH_REQUIRED_MESSAGE: &str = "Auth error, please sign in again.";

/// Server-assigned record id; numeric or textual depending on the backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Number(i64),
    Text(String),
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::Number(id) => write!(f, "{id}"),
            RecordId::Text(id) => f.write_str(id),
        }
    }
}

/// One past analysis as returned by the history endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub id: RecordId,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub total_lines: Option<u64>,
    #[serde(default)]
    pub critical: Option<u64>,
    #[serde(default)]
    pub errors: Option<u64>,
    #[serde(default)]
    pub warnings: Option<u64>,
    #[serde(default)]
    pub summary: Option<String>,
}

impl HistoryRecord {
    pub fn display_file_name(&self) -> &str {
        self.file_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .unwrap_or(UNTITLED_FILE)
    }

    pub fn display_summary(&self) -> &str {
        self.summary
            .as_deref()
            .filter(|summary| !summary.is_empty())
            .unwrap_or(NO_SUMMARY)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRow {
    pub id: String,
    pub file_name: String,
    pub date: String,
    pub total_lines: String,
    pub critical: u64,
    pub errors: u64,
    pub warnings: u64,
    pub summary: String,
}

impl From<&HistoryRecord> for HistoryRow {
    fn from(record: &HistoryRecord) -> Self {
        Self {
            id: record.id.to_string(),
            file_name: record.display_file_name().to_string(),
            date: format_created_at(record.created_at.as_deref()),
            total_lines: format_with_commas(record.total_lines.unwrap_or(0)),
            critical: record.critical.unwrap_or(0),
            errors: record.errors.unwrap_or(0),
            warnings: record.warnings.unwrap_or(0),
            summary: record.display_summary().to_string(),
        }
    }
}

/// What the history page shows. An empty result is its own state, not a
/// failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryView {
    Empty,
    Loaded {
        count_label: String,
        rows: Vec<HistoryRow>,
    },
    Failed {
        message: String,
    },
}

impl HistoryView {
    pub fn from_records(records: &[HistoryRecord]) -> Self {
        if records.is_empty() {
            return HistoryView::Empty;
        }
        HistoryView::Loaded {
            count_label: count_label(records.len()),
            rows: records.iter().map(HistoryRow::from).collect(),
        }
    }

    pub fn failed(reason: impl fmt::Display) -> Self {
        HistoryView::Failed {
            message: format!("Failed to load history: {reason}"),
        }
    }

    pub fn auth_required() -> Self {
        HistoryView::Failed {
            message: AUTH_REQUIRED_MESSAGE.to_string(),
        }
    }

    pub fn rows(&self) -> &[HistoryRow] {
        match self {
            HistoryView::Loaded { rows, .. } => rows,
            HistoryView::Empty | HistoryView::Failed { .. } => &[],
        }
    }
}

fn count_label(count: usize) -> String {
    if count == 1 {
        "1 analysis".to_string()
    } else {
        format!("{count} analyses")
    }
}

/// Formats a stored timestamp as `Jan 5, 2026, 09:30 AM UTC`.
///
/// Accepts RFC 3339 with any offset, or a naive timestamp taken as UTC.
/// Unparseable values are shown verbatim.
pub fn format_created_at(raw: Option<&str>) -> String {
    let Some(raw) = raw.map(str::trim).filter(|raw| !raw.is_empty()) else {
        return UNKNOWN_DATE.to_string();
    };
    match parse_timestamp(raw) {
        Some(at) => at.format("%b %-d, %Y, %I:%M %p UTC").to_string(),
        None => raw.to_string(),
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Some(at.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
        .map(|naive| naive.and_utc())
}
