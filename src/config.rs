use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration from TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Local store configuration.
    #[serde(default)]
    pub store: StoreConfig,

    /// Reader configuration.
    #[serde(default)]
    pub reader: ReaderConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Local store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Path to the SQLite file backing the key-value store.
    #[serde(default = "default_store_path")]
    pub path: PathBuf,

    /// Key holding the book collection.
    #[serde(default = "default_books_key")]
    pub books_key: String,

    /// Key holding the last successful import timestamp.
    #[serde(default = "default_last_sync_key")]
    pub last_sync_key: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
            books_key: default_books_key(),
            last_sync_key: default_last_sync_key(),
        }
    }
}

fn default_store_path() -> PathBuf {
    PathBuf::from("data/reader.db")
}

fn default_books_key() -> String {
    "cloudsync-reader-mvp-books".to_string()
}

fn default_last_sync_key() -> String {
    "cloudsync-reader-last-sync".to_string()
}

/// Reader configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReaderConfig {
    /// Scale passed to the PDF engine when rendering a page.
    #[serde(default = "default_pdf_scale")]
    pub pdf_scale: f32,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            pdf_scale: default_pdf_scale(),
        }
    }
}

fn default_pdf_scale() -> f32 {
    1.25
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default `tracing` filter, overridden by `RUST_LOG`.
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

fn default_log_filter() -> String {
    "cloudsync_reader=info".to_string()
}

impl Config {
    /// Load configuration from file.
    pub fn load(path: &PathBuf) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            crate::error::AppError::Config(format!("Failed to read config file: {}", e))
        })?;

        Self::parse(&content)
    }

    /// Parse configuration from TOML text.
    pub fn parse(content: &str) -> crate::error::Result<Self> {
        toml::from_str(content).map_err(|e| {
            crate::error::AppError::Config(format!("Failed to parse config file: {}", e))
        })
    }

    /// Find config file in default locations.
    pub fn find_config_file() -> Option<PathBuf> {
        let candidates = [
            PathBuf::from("cloudsync-reader.toml"),
            dirs::config_dir()
                .map(|p| p.join("cloudsync-reader").join("config.toml"))
                .unwrap_or_default(),
        ];

        candidates
            .into_iter()
            .find(|p| !p.as_os_str().is_empty() && p.exists())
    }

    /// Generate default config file content.
    pub fn generate_default() -> String {
        r#"# cloudsync-reader configuration

[store]
path = "data/reader.db"
books_key = "cloudsync-reader-mvp-books"
last_sync_key = "cloudsync-reader-last-sync"

[reader]
# Render scale handed to the PDF engine
pdf_scale = 1.25

[logging]
# Overridden by RUST_LOG when set
filter = "cloudsync_reader=info"
"#
        .to_string()
    }
}

/// Supported book formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookFormat {
    /// PDF format (Portable Document Format).
    Pdf,
    /// EPUB format (Electronic Publication).
    Epub,
}

impl BookFormat {
    /// Get the MIME type for this format.
    pub fn mime_type(&self) -> &'static str {
        match self {
            BookFormat::Pdf => "application/pdf",
            BookFormat::Epub => "application/epub+zip",
        }
    }

    /// Wire name used in snapshots and merge keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            BookFormat::Pdf => "pdf",
            BookFormat::Epub => "epub",
        }
    }

    /// Try to detect format from file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "pdf" => Some(BookFormat::Pdf),
            "epub" => Some(BookFormat::Epub),
            _ => None,
        }
    }

    /// Detect format from the extension of an uploaded filename.
    pub fn from_filename(name: &str) -> Option<Self> {
        let (_, ext) = name.rsplit_once('.')?;
        Self::from_extension(ext)
    }
}

impl std::fmt::Display for BookFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
