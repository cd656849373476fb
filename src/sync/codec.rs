//! Sync code encoding: base64 over UTF-8 JSON.

use crate::library::identity::{RawBook, normalize, parse_timestamp};
use crate::library::Book;
use base64::{Engine, engine::general_purpose::STANDARD};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Snapshot format written by this version.
pub const FORMAT_VERSION: u32 = 1;

/// Versioned, timestamped export of a whole library.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// Snapshot format version.
    pub format_version: u32,
    /// When the snapshot was taken.
    pub exported_at: DateTime<Utc>,
    /// Library contents.
    pub books: Vec<Book>,
}

impl Snapshot {
    /// Snapshot the given books at the current format version.
    pub fn new(books: Vec<Book>, exported_at: DateTime<Utc>) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            exported_at,
            books,
        }
    }
}

/// Reasons a sync code is rejected.
///
/// Callers present all of these the same way; the detail is for logs.
#[derive(Error, Debug)]
pub enum DecodeError {
    /// Not valid padded base64.
    #[error("not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    /// Decoded bytes are not UTF-8.
    #[error("payload is not UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    /// Decoded text is not JSON.
    #[error("payload is not JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// No `books` sequence in the payload.
    #[error("payload has no book list")]
    MissingBooks,

    /// A `books` entry is not a usable record.
    #[error("book #{index} is malformed: {reason}")]
    InvalidBook {
        /// Position in the `books` sequence.
        index: usize,
        /// What was wrong with it.
        reason: String,
    },
}

/// Encode a snapshot as a printable sync code.
pub fn encode(snapshot: &Snapshot) -> crate::error::Result<String> {
    let json = serde_json::to_string(snapshot)?;
    Ok(STANDARD.encode(json.as_bytes()))
}

/// Decode a sync code, normalizing every book it contains.
pub fn decode(code: &str) -> Result<Snapshot, DecodeError> {
    decode_at(code, Utc::now())
}

/// Decode a sync code, using `now` for records without a usable timestamp.
pub fn decode_at(code: &str, now: DateTime<Utc>) -> Result<Snapshot, DecodeError> {
    let bytes = STANDARD.decode(code.trim())?;
    let text = String::from_utf8(bytes)?;
    let value: Value = serde_json::from_str(&text)?;

    let Value::Object(mut root) = value else {
        return Err(DecodeError::MissingBooks);
    };
    let Some(Value::Array(entries)) = root.remove("books") else {
        return Err(DecodeError::MissingBooks);
    };

    let books = entries
        .into_iter()
        .enumerate()
        .map(|(index, entry)| {
            if !entry.is_object() {
                return Err(DecodeError::InvalidBook {
                    index,
                    reason: "not an object".to_string(),
                });
            }
            serde_json::from_value::<RawBook>(entry)
                .map(|raw| normalize(raw, now))
                .map_err(|e| DecodeError::InvalidBook {
                    index,
                    reason: e.to_string(),
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    // Not checked against a compatibility table yet.
    let format_version = root
        .get("formatVersion")
        .and_then(Value::as_u64)
        .and_then(|v| u32::try_from(v).ok())
        .unwrap_or(FORMAT_VERSION);

    let exported_at = root
        .get("exportedAt")
        .and_then(parse_timestamp)
        .unwrap_or(now);

    Ok(Snapshot {
        format_version,
        exported_at,
        books,
    })
}
