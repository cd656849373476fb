//! The running library session.
//!
//! [`LibrarySession`] owns the in-memory collection. Every user action goes
//! through it and follows the same sequence: mutate the collection, persist it,
//! then notify observers.

mod events;

pub use events::{ImportSummary, LibraryChange, LibraryObserver};

use crate::config::{BookFormat, Config, ReaderConfig};
use crate::error::{AppError, Result};
use crate::library::{Book, LibraryStats, Progress};
use crate::store::LocalStore;
use crate::sync::{self, Snapshot};
use chrono::{DateTime, Utc};

/// A file picked by the user for upload.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Filename including extension.
    pub name: String,
    /// File contents.
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    /// Create an upload from a name and its contents.
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }
}

/// Identifies one open of one book.
///
/// Becomes stale as soon as another book is opened or the reader is closed;
/// anything carrying a stale handle is ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReaderHandle {
    book_id: String,
    generation: u64,
}

impl ReaderHandle {
    /// Id of the book this handle belongs to.
    pub fn book_id(&self) -> &str {
        &self.book_id
    }
}

/// Everything a reader engine needs to open a book.
#[derive(Debug, Clone)]
pub struct OpenTicket {
    handle: ReaderHandle,
    progress: Progress,
    content: String,
}

impl OpenTicket {
    /// Handle of this open.
    pub fn handle(&self) -> &ReaderHandle {
        &self.handle
    }

    /// Saved position at the time of opening.
    pub fn progress(&self) -> &Progress {
        &self.progress
    }

    /// Document payload.
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Format of the book being opened.
    pub fn format(&self) -> BookFormat {
        self.progress.format()
    }
}

/// The library as seen by one running session.
pub struct LibrarySession {
    books: Vec<Book>,
    store: LocalStore,
    reader: ReaderConfig,
    active: Option<ReaderHandle>,
    generation: u64,
    observers: Vec<Box<dyn LibraryObserver>>,
}

impl LibrarySession {
    /// Start a session on top of a store, loading the saved library.
    pub fn new(store: LocalStore, reader: ReaderConfig) -> Self {
        let books = store.load_books();
        tracing::info!(books = books.len(), "Loaded library");

        Self {
            books,
            store,
            reader,
            active: None,
            generation: 0,
            observers: Vec::new(),
        }
    }

    /// Start a session from configuration, opening the SQLite store.
    pub fn from_config(config: &Config) -> Result<Self> {
        let store = LocalStore::open(&config.store)?;
        Ok(Self::new(store, config.reader.clone()))
    }

    /// Register an observer notified after every change.
    pub fn subscribe(&mut self, observer: impl LibraryObserver + 'static) {
        self.observers.push(Box::new(observer));
    }

    /// All books, most recently added or synced first.
    pub fn books(&self) -> &[Book] {
        &self.books
    }

    /// Look up a book by id.
    pub fn book(&self, id: &str) -> Option<&Book> {
        self.books.iter().find(|b| b.id == id)
    }

    /// Books matching a search query, in library order.
    pub fn search(&self, query: &str) -> Vec<&Book> {
        self.books.iter().filter(|b| b.matches(query)).collect()
    }

    /// Library counts.
    pub fn stats(&self) -> LibraryStats {
        LibraryStats::of(&self.books)
    }

    /// Time of the last successful import.
    pub fn last_sync(&self) -> Option<DateTime<Utc>> {
        self.store.last_sync()
    }

    /// Reader settings.
    pub fn reader_config(&self) -> &ReaderConfig {
        &self.reader
    }

    /// Mutable access to the store, e.g. to start its background writer.
    pub fn store_mut(&mut self) -> &mut LocalStore {
        &mut self.store
    }

    /// Add uploaded files to the library.
    ///
    /// Files that are not `.pdf` or `.epub` are skipped. New books go to the
    /// front of the library in upload order. Returns the new ids; nothing is
    /// opened, the host decides whether to [`open`](Self::open) one.
    pub fn upload(&mut self, files: impl IntoIterator<Item = UploadedFile>) -> Result<Vec<String>> {
        let now = Utc::now();
        let mut added = Vec::new();

        for file in files {
            let Some(format) = BookFormat::from_filename(&file.name) else {
                tracing::debug!(file = %file.name, "Skipping unsupported upload");
                continue;
            };
            added.push(Book::new(&file.name, format, &file.bytes, now));
        }

        if added.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<String> = added.iter().map(|b| b.id.clone()).collect();
        tracing::info!(count = ids.len(), "Added books");

        added.append(&mut self.books);
        self.books = added;

        self.commit(LibraryChange::Added { ids: ids.clone() })?;
        Ok(ids)
    }

    /// Remove a book, closing the reader if it was open.
    pub fn remove(&mut self, id: &str) -> Result<Book> {
        let index = self
            .books
            .iter()
            .position(|b| b.id == id)
            .ok_or_else(|| AppError::NotFound(id.to_string()))?;

        if self.active.as_ref().is_some_and(|h| h.book_id == id) {
            self.close();
        }

        let removed = self.books.remove(index);
        tracing::info!(id = %removed.id, title = %removed.title, "Removed book");

        self.commit(LibraryChange::Removed {
            id: removed.id.clone(),
            title: removed.title.clone(),
        })?;
        Ok(removed)
    }

    /// Book currently open in the reader.
    pub fn active_book(&self) -> Option<&Book> {
        self.active.as_ref().and_then(|h| self.book(&h.book_id))
    }

    /// Select a book for reading.
    ///
    /// Any previous open becomes stale. The returned ticket carries what the
    /// PDF or EPUB engine needs to load the document.
    pub fn open(&mut self, id: &str) -> Result<OpenTicket> {
        let book = self
            .books
            .iter()
            .find(|b| b.id == id)
            .ok_or_else(|| AppError::NotFound(id.to_string()))?;

        self.generation += 1;
        let handle = ReaderHandle {
            book_id: book.id.clone(),
            generation: self.generation,
        };
        let ticket = OpenTicket {
            handle: handle.clone(),
            progress: book.progress.clone(),
            content: book.content.clone(),
        };

        tracing::debug!(id = %book.id, format = %book.format(), "Opening book");
        self.active = Some(handle);
        Ok(ticket)
    }

    /// Close the reader. Pending opens become stale.
    pub fn close(&mut self) {
        if self.active.take().is_some() {
            self.generation += 1;
        }
    }

    /// Whether `handle` belongs to the open currently shown.
    pub fn is_current(&self, handle: &ReaderHandle) -> bool {
        self.active.as_ref() == Some(handle)
    }

    /// The engine failed to open the document; the book can be picked again.
    pub fn open_failed(&mut self, handle: &ReaderHandle, error: &AppError) {
        tracing::warn!(id = %handle.book_id, error = %error, "Failed to open book");
        if self.is_current(handle) {
            self.close();
        }
    }

    /// Record the PDF page the reader confirmed.
    ///
    /// Returns `false` when the handle is stale or the page did not change.
    pub fn record_page(&mut self, handle: &ReaderHandle, page: u32) -> Result<bool> {
        if page == 0 {
            return Err(AppError::InvalidFormat("PDF pages start at 1".to_string()));
        }
        self.record_progress(handle, Progress::Pdf { page })
    }

    /// Record a locator reported by the EPUB reader.
    ///
    /// Returns `false` when the handle is stale, the locator is empty or it did
    /// not change. An empty locator never replaces a saved position.
    pub fn record_locator(&mut self, handle: &ReaderHandle, locator: &str) -> Result<bool> {
        if locator.is_empty() {
            return Ok(false);
        }
        self.record_progress(
            handle,
            Progress::Epub {
                locator: Some(locator.to_string()),
            },
        )
    }

    fn record_progress(&mut self, handle: &ReaderHandle, progress: Progress) -> Result<bool> {
        if !self.is_current(handle) {
            tracing::debug!(id = %handle.book_id, "Ignoring progress from a closed reader");
            return Ok(false);
        }

        let book = self
            .books
            .iter_mut()
            .find(|b| b.id == handle.book_id)
            .ok_or_else(|| AppError::NotFound(handle.book_id.clone()))?;

        if book.format() != progress.format() {
            return Err(AppError::InvalidFormat(format!(
                "{} progress for a {} book",
                progress.format(),
                book.format()
            )));
        }
        if book.progress == progress {
            return Ok(false);
        }

        book.progress = progress;
        book.updated_at = Utc::now();
        let id = book.id.clone();

        self.commit(LibraryChange::Progress { id })?;
        Ok(true)
    }

    /// Export the library as a sync code.
    pub fn export_code(&self) -> Result<String> {
        let snapshot = Snapshot::new(self.books.clone(), Utc::now());
        let code = sync::encode(&snapshot)?;
        tracing::info!(books = snapshot.books.len(), "Exported sync code");
        Ok(code)
    }

    /// Merge a sync code from another device into the library.
    ///
    /// A malformed code leaves the library untouched.
    pub fn import_code(&mut self, code: &str) -> Result<ImportSummary> {
        let snapshot = sync::decode(code).inspect_err(|e| {
            tracing::warn!(error = %e, "Rejected sync code");
        })?;

        let local = std::mem::take(&mut self.books);
        let outcome = sync::merge_detailed(local, snapshot.books);
        self.books = outcome.books;

        let summary = ImportSummary {
            added: outcome.added,
            updated: outcome.updated,
            kept: outcome.kept,
            total: self.books.len(),
        };
        tracing::info!(
            added = summary.added,
            updated = summary.updated,
            kept = summary.kept,
            total = summary.total,
            exported_at = %snapshot.exported_at,
            "Imported sync code"
        );

        self.commit(LibraryChange::Imported(summary))?;
        self.store.set_last_sync(Utc::now())?;
        Ok(summary)
    }

    fn commit(&mut self, change: LibraryChange) -> Result<()> {
        let saved = self.store.save_books(&self.books);
        if let Err(e) = &saved {
            tracing::error!(error = %e, "Failed to save library");
        }

        for observer in &mut self.observers {
            observer.library_changed(&change, &self.books);
        }
        saved
    }
}
