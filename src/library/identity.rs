//! Merge identity and normalization of untrusted book records.
//!
//! Everything that enters the library from outside the process (a decoded
//! sync code, a value read back from the store) goes through [`normalize`],
//! which is the only place where partial or oddly-typed records are coerced
//! into a [`Book`].

use crate::config::BookFormat;
use crate::library::book::{Book, Progress};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Deserialize;
use serde_json::{Value, json};
use uuid::Uuid;

/// Title given to records that arrive without one.
pub const UNTITLED: &str = "Untitled";

/// Filename given to records that arrive without one.
pub const PLACEHOLDER_FILENAME: &str = "unknown";

/// A possibly-partial book record as found in snapshots and stored data.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawBook {
    /// Identifier, possibly foreign to this device.
    pub id: Option<String>,
    /// Display title.
    pub title: Option<String>,
    /// Uploaded filename.
    pub filename: Option<String>,
    /// Format name; anything but `"epub"` is read as PDF.
    #[serde(rename = "type")]
    pub kind: Option<Value>,
    /// Document payload (`dataUrl` in older exports).
    #[serde(alias = "dataUrl")]
    pub content: Option<String>,
    /// Progress object, shape depends on the format.
    pub progress: Option<Value>,
    /// RFC 3339 string or epoch milliseconds.
    pub updated_at: Option<Value>,
    /// Creation time written by older versions, used when `updatedAt` is absent.
    pub added_at: Option<Value>,
}

impl From<&Book> for RawBook {
    fn from(book: &Book) -> Self {
        let progress = match &book.progress {
            Progress::Pdf { page } => json!({ "page": page }),
            Progress::Epub { locator } => json!({ "locator": locator }),
        };

        Self {
            id: Some(book.id.clone()),
            title: Some(book.title.clone()),
            filename: Some(book.filename.clone()),
            kind: Some(Value::String(book.format().as_str().to_string())),
            content: Some(book.content.clone()),
            progress: Some(progress),
            updated_at: Some(Value::String(
                book.updated_at.to_rfc3339_opts(SecondsFormat::AutoSi, true),
            )),
            added_at: None,
        }
    }
}

/// Derived identity used to match books across two collections.
pub fn merge_key(book: &Book) -> String {
    format!("{}::{}", book.filename.to_lowercase(), book.format())
}

/// Fill in missing fields and coerce the record into a well-typed [`Book`].
///
/// `now` is used when the record carries no usable timestamp. Already
/// normalized records come back unchanged.
pub fn normalize(raw: RawBook, now: DateTime<Utc>) -> Book {
    // Fail-open: unknown formats become PDFs instead of being rejected.
    let format = match raw.kind.as_ref() {
        Some(Value::String(kind)) if kind == "epub" => BookFormat::Epub,
        _ => BookFormat::Pdf,
    };

    let updated_at = raw
        .updated_at
        .as_ref()
        .and_then(parse_timestamp)
        .or_else(|| raw.added_at.as_ref().and_then(parse_timestamp))
        .unwrap_or(now);

    Book {
        id: non_empty(raw.id).unwrap_or_else(|| Uuid::new_v4().to_string()),
        title: non_empty(raw.title).unwrap_or_else(|| UNTITLED.to_string()),
        filename: non_empty(raw.filename).unwrap_or_else(|| PLACEHOLDER_FILENAME.to_string()),
        progress: normalize_progress(format, raw.progress.as_ref()),
        content: raw.content.unwrap_or_default(),
        updated_at,
    }
}

fn normalize_progress(format: BookFormat, progress: Option<&Value>) -> Progress {
    match format {
        BookFormat::Pdf => {
            let page = progress
                .and_then(|p| p.get("page"))
                .and_then(Value::as_u64)
                .filter(|page| *page >= 1)
                .map(|page| u32::try_from(page).unwrap_or(u32::MAX))
                .unwrap_or(1);
            Progress::Pdf { page }
        }
        BookFormat::Epub => {
            let locator = progress
                .and_then(|p| p.get("locator").or_else(|| p.get("cfi")))
                .and_then(Value::as_str)
                .filter(|locator| !locator.is_empty())
                .map(String::from);
            Progress::Epub { locator }
        }
    }
}

pub(crate) fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        Value::Number(n) => n.as_i64().and_then(DateTime::from_timestamp_millis),
        _ => None,
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}
