//! Reader controllers and the engine interfaces they drive.
//!
//! Rendering is done by third-party PDF and EPUB engines supplied by the host.
//! The controllers here only translate between engine events and the
//! `progress` stored in the library.
//!
//! Engine work never borrows the session. Opening a PDF looks like:
//!
//! ```ignore
//! let ticket = session.open(&id)?;
//! let loaded = reader::load_pdf(&engine, ticket).await;
//! if let Some(mut pdf) = PdfReader::attach(&mut session, loaded)? {
//!     pdf.render().await?;
//!     pdf.commit(&mut session)?;
//! }
//! ```
//!
//! and every later page turn is `turn(..).await` followed by `commit`.

mod epub;
mod pdf;

pub use epub::EpubReader;
pub use pdf::PdfReader;

use crate::config::BookFormat;
use crate::error::{AppError, Result};
use crate::library::Progress;
use crate::session::{LibrarySession, OpenTicket, ReaderHandle};

/// Loads PDF documents.
#[allow(async_fn_in_trait)]
pub trait PdfEngine {
    /// Document type produced by this engine.
    type Document: PdfDocument;

    /// Parse a document from its `data:` reference.
    async fn load(&self, content: &str) -> Result<Self::Document>;
}

/// A loaded PDF document.
#[allow(async_fn_in_trait)]
pub trait PdfDocument {
    /// Number of pages in the document.
    fn page_count(&self) -> u32;

    /// Render a 1-indexed page; resolves once the page is on screen.
    async fn render_page(&mut self, page: u32, scale: f32) -> Result<()>;
}

/// Displays EPUB documents.
#[allow(async_fn_in_trait)]
pub trait EpubEngine {
    /// Rendition type produced by this engine.
    type Rendition: EpubRendition;

    /// Render a document, starting at `start` when given.
    ///
    /// The host forwards the rendition's "relocated" events to
    /// [`EpubReader::relocated`].
    async fn display(&self, content: &str, start: Option<&str>) -> Result<Self::Rendition>;
}

/// A displayed EPUB document.
pub trait EpubRendition {
    /// Move to the next screen.
    fn next(&mut self);

    /// Move to the previous screen.
    fn prev(&mut self);
}

/// An engine result waiting to be attached to the session.
///
/// Produced without touching the session, so the host stays free to open,
/// close or import while the engine works.
pub struct Loaded<T> {
    ticket: OpenTicket,
    result: Result<T>,
}

impl<T> Loaded<T> {
    /// Handle of the open this result belongs to.
    pub fn handle(&self) -> &ReaderHandle {
        self.ticket.handle()
    }

    /// Check the result against the session.
    ///
    /// An engine error releases the book via [`LibrarySession::open_failed`].
    /// Returns `Ok(None)` if the open was superseded while loading.
    fn settle(self, session: &mut LibrarySession) -> Result<Option<(OpenTicket, T)>> {
        match self.result {
            Ok(value) if session.is_current(self.ticket.handle()) => {
                Ok(Some((self.ticket, value)))
            }
            Ok(_) => {
                tracing::debug!(id = %self.ticket.handle().book_id(), "Discarding superseded open");
                Ok(None)
            }
            Err(e) => {
                session.open_failed(self.ticket.handle(), &e);
                Err(e)
            }
        }
    }
}

/// Load a PDF for an open ticket.
pub async fn load_pdf<E: PdfEngine>(engine: &E, ticket: OpenTicket) -> Loaded<E::Document> {
    let result = match expect_format(&ticket, BookFormat::Pdf) {
        Ok(()) => engine.load(ticket.content()).await,
        Err(e) => Err(e),
    };
    Loaded { ticket, result }
}

/// Display an EPUB for an open ticket, starting at its saved locator.
pub async fn display_epub<E: EpubEngine>(engine: &E, ticket: OpenTicket) -> Loaded<E::Rendition> {
    let result = match expect_format(&ticket, BookFormat::Epub) {
        Ok(()) => {
            let start = match ticket.progress() {
                Progress::Epub { locator } => locator.as_deref(),
                Progress::Pdf { .. } => None,
            };
            engine.display(ticket.content(), start).await
        }
        Err(e) => Err(e),
    };
    Loaded { ticket, result }
}

fn expect_format(ticket: &OpenTicket, format: BookFormat) -> Result<()> {
    if ticket.format() == format {
        Ok(())
    } else {
        Err(AppError::InvalidFormat(format!(
            "expected a {} book, got {}",
            format,
            ticket.format()
        )))
    }
}
