//! Book record model.

use crate::config::BookFormat;
use crate::library::identity::UNTITLED;
use base64::{Engine, engine::general_purpose::STANDARD};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Represents a document in the local library.
///
/// The `type` and `progress` fields of the wire format are carried together by
/// [`Progress`], so a PDF can never hold a locator and an EPUB never a page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    /// Unique identifier for the book.
    pub id: String,

    /// Display title.
    pub title: String,

    /// Original uploaded filename.
    pub filename: String,

    /// Format and reading position.
    #[serde(flatten)]
    pub progress: Progress,

    /// Document payload as a `data:` reference.
    pub content: String,

    /// Last progress or metadata change.
    pub updated_at: DateTime<Utc>,
}

/// Reading position, keyed by format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "progress", rename_all = "lowercase")]
pub enum Progress {
    /// Current page of a PDF (1-indexed).
    Pdf {
        /// Page number, always at least 1.
        page: u32,
    },
    /// Opaque position token of an EPUB rendition.
    Epub {
        /// Locator reported by the EPUB engine, if any.
        locator: Option<String>,
    },
}

impl Progress {
    /// Starting position for a freshly added book.
    pub fn initial(format: BookFormat) -> Self {
        match format {
            BookFormat::Pdf => Progress::Pdf { page: 1 },
            BookFormat::Epub => Progress::Epub { locator: None },
        }
    }

    /// Format this progress belongs to.
    pub fn format(&self) -> BookFormat {
        match self {
            Progress::Pdf { .. } => BookFormat::Pdf,
            Progress::Epub { .. } => BookFormat::Epub,
        }
    }
}

impl Book {
    /// Create a new book from an uploaded file.
    pub fn new(filename: &str, format: BookFormat, bytes: &[u8], now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: title_from_filename(filename),
            filename: filename.to_string(),
            progress: Progress::initial(format),
            content: data_url(format, bytes),
            updated_at: now,
        }
    }

    /// File format of the book.
    pub fn format(&self) -> BookFormat {
        self.progress.format()
    }

    /// Current PDF page, if this is a PDF.
    pub fn page(&self) -> Option<u32> {
        match self.progress {
            Progress::Pdf { page } => Some(page),
            Progress::Epub { .. } => None,
        }
    }

    /// Saved EPUB locator, if this is an EPUB with a saved position.
    pub fn locator(&self) -> Option<&str> {
        match &self.progress {
            Progress::Epub { locator } => locator.as_deref(),
            Progress::Pdf { .. } => None,
        }
    }

    /// Short progress description for the library list.
    pub fn progress_label(&self) -> String {
        match &self.progress {
            Progress::Pdf { page } => format!("Page {}", page),
            Progress::Epub { locator: Some(_) } => "Saved location".to_string(),
            Progress::Epub { locator: None } => "Start".to_string(),
        }
    }

    /// Case-insensitive search over title, filename and format.
    pub fn matches(&self, query: &str) -> bool {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return true;
        }

        format!("{} {} {}", self.title, self.filename, self.format())
            .to_lowercase()
            .contains(&query)
    }
}

/// Strip a trailing `.pdf` or `.epub` (any case) from a filename.
///
/// A filename that is nothing but the extension gets [`UNTITLED`].
pub fn title_from_filename(filename: &str) -> String {
    let stem = [".pdf", ".epub"]
        .into_iter()
        .find_map(|ext| {
            let split = filename.len().checked_sub(ext.len())?;
            // An ASCII suffix always starts on a char boundary.
            filename.as_bytes()[split..]
                .eq_ignore_ascii_case(ext.as_bytes())
                .then(|| &filename[..split])
        })
        .unwrap_or(filename);

    if stem.is_empty() {
        UNTITLED.to_string()
    } else {
        stem.to_string()
    }
}

/// Encode file bytes as a `data:` reference.
pub fn data_url(format: BookFormat, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", format.mime_type(), STANDARD.encode(bytes))
}
