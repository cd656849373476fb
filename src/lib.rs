//! cloudsync-reader: a local PDF/EPUB library with reading progress and
//! copy-paste sync between devices.
//!
//! The library lives on one device in a key-value store. To move it to another
//! device the user exports a sync code (a base64 snapshot of the whole
//! library) and imports it on the other side, where it is merged book by book
//! with whatever that device already has. There is no server.
//!
//! # Features
//!
//! - PDF and EPUB uploads with per-book progress (page or locator)
//! - Sync codes and a two-way, recency-based merge
//! - SQLite or in-memory persistence behind a key-value trait
//! - Reader controllers for host-supplied PDF and EPUB engines
//! - Library search and counts

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Configuration.
pub mod config;
/// Error types.
pub mod error;
/// Book records and normalization.
pub mod library;
/// Tracing setup.
pub mod logging;
/// Reader controllers and engine interfaces.
pub mod reader;
/// The running library session.
pub mod session;
/// Local persistence.
pub mod store;
/// Sync codes and merging.
pub mod sync;

#[cfg(test)]
mod tests;

pub use config::{BookFormat, Config};
pub use error::{AppError, Result};
pub use library::{Book, Progress};
pub use session::{LibrarySession, UploadedFile};
pub use store::{KeyValueStore, LocalStore};
