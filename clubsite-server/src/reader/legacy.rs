//! Legacy CSV data (`pilots.csv`, `sponsors.csv`)
//!
//! Files are re-read on every call. Exported spreadsheets wrap many values in
//! an extra layer of quotes, which is stripped once per field.

use clubsite_common::models::{Pilot, Sponsor};
use clubsite_common::sanitize::{normalize_slug, strip_matching_quotes};
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::ReaderError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegacyKind {
    Pilots,
    Sponsors,
}

impl LegacyKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "pilots" => Some(LegacyKind::Pilots),
            "sponsors" => Some(LegacyKind::Sponsors),
            _ => None,
        }
    }

    pub fn file_name(self) -> &'static str {
        match self {
            LegacyKind::Pilots => "pilots.csv",
            LegacyKind::Sponsors => "sponsors.csv",
        }
    }
}

/// One typed legacy row
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum LegacyRow {
    Pilot(Pilot),
    Sponsor(Sponsor),
}

/// CSV columns holding HTML; never unquoted
const HTML_COLUMNS: [&str; 1] = ["bio"];

/// Sanitized header -> value rows
pub type RawRow = Map<String, Value>;

#[derive(Debug, Clone)]
pub struct LegacyCsv {
    dir: PathBuf,
}

impl LegacyCsv {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self, kind: LegacyKind) -> PathBuf {
        self.dir.join(kind.file_name())
    }

    /// All rows of a legacy file, typed; `None` when the file does not exist
    pub async fn rows(&self, kind: LegacyKind) -> Result<Option<Vec<LegacyRow>>, ReaderError> {
        let path = self.path(kind);
        let raw = tokio::task::spawn_blocking(move || read_raw_rows(&path))
            .await
            .map_err(|e| ReaderError::Legacy(format!("CSV reader task failed: {}", e)))??;

        let Some(raw) = raw else {
            return Ok(None);
        };

        let rows = raw
            .into_iter()
            .enumerate()
            .filter_map(|(index, row)| match to_typed(kind, row) {
                Ok(row) => Some(row),
                Err(e) => {
                    warn!(file = %kind.file_name(), line = index + 2, error = %e, "Skipping legacy row");
                    None
                }
            })
            .collect();
        Ok(Some(rows))
    }
}

/// Parse a CSV file with headers, stripping one quote layer per string value
pub fn read_raw_rows(path: &Path) -> Result<Option<Vec<RawRow>>, ReaderError> {
    let mut reader = match csv::ReaderBuilder::new().trim(csv::Trim::All).from_path(path) {
        Ok(reader) => reader,
        Err(e) => {
            if let csv::ErrorKind::Io(io) = e.kind() {
                if io.kind() == std::io::ErrorKind::NotFound {
                    debug!(path = %path.display(), "Legacy CSV file not present");
                    return Ok(None);
                }
            }
            return Err(ReaderError::Legacy(e.to_string()));
        }
    };

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| ReaderError::Legacy(e.to_string()))?
        .iter()
        .map(|h| strip_matching_quotes(h.trim_start_matches('\u{feff}')).to_string())
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| ReaderError::Legacy(e.to_string()))?;
        let row: RawRow = headers
            .iter()
            .zip(record.iter())
            .map(|(header, value)| {
                let value = if HTML_COLUMNS.contains(&header.as_str()) {
                    value
                } else {
                    strip_matching_quotes(value)
                };
                (header.clone(), Value::String(value.to_string()))
            })
            .collect();
        rows.push(row);
    }
    Ok(Some(rows))
}

fn text<'a>(row: &'a RawRow, key: &str) -> Option<&'a str> {
    row.get(key).and_then(Value::as_str).filter(|v| !v.is_empty())
}

/// Convert string-typed CSV columns to their model types and deserialize
fn to_typed(kind: LegacyKind, mut row: RawRow) -> Result<LegacyRow, String> {
    match kind {
        LegacyKind::Pilots => {
            if text(&row, "id").is_none() {
                let id = text(&row, "profileSlug")
                    .map(str::to_string)
                    .or_else(|| text(&row, "name").map(normalize_slug))
                    .ok_or("row has neither id nor name")?;
                row.insert("id".to_string(), Value::String(id));
            }
            serde_json::from_value(Value::Object(row))
                .map(LegacyRow::Pilot)
                .map_err(|e| e.to_string())
        }
        LegacyKind::Sponsors => {
            if text(&row, "id").is_none() {
                let id = text(&row, "name")
                    .map(normalize_slug)
                    .ok_or("row has neither id nor name")?;
                row.insert("id".to_string(), Value::String(id));
            }
            match text(&row, "isActive").map(str::to_ascii_lowercase) {
                Some(flag) => {
                    let active = matches!(flag.as_str(), "true" | "1" | "yes" | "ja");
                    row.insert("isActive".to_string(), Value::Bool(active));
                }
                None => {
                    row.remove("isActive");
                }
            }
            match text(&row, "displayOrder") {
                Some(order) => {
                    let order: i64 = order
                        .parse()
                        .map_err(|_| format!("displayOrder '{}' is not a number", order))?;
                    row.insert("displayOrder".to_string(), Value::from(order));
                }
                None => {
                    row.remove("displayOrder");
                }
            }
            serde_json::from_value(Value::Object(row))
                .map(LegacyRow::Sponsor)
                .map_err(|e| e.to_string())
        }
    }
}
