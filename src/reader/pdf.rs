use crate::error::Result;
use crate::library::Progress;
use crate::reader::{Loaded, PdfDocument};
use crate::session::{LibrarySession, ReaderHandle};

/// Page-based controller for an open PDF.
pub struct PdfReader<D> {
    handle: ReaderHandle,
    document: D,
    page: u32,
    pages: u32,
    scale: f32,
}

impl<D: PdfDocument> PdfReader<D> {
    /// Attach a loaded document to the session.
    ///
    /// The saved page is clamped to the document length. Returns `Ok(None)`
    /// if the user moved on while the document loaded.
    pub fn attach(session: &mut LibrarySession, loaded: Loaded<D>) -> Result<Option<Self>> {
        let Some((ticket, document)) = loaded.settle(session)? else {
            return Ok(None);
        };

        let pages = document.page_count().max(1);
        let saved = match ticket.progress() {
            Progress::Pdf { page } => *page,
            Progress::Epub { .. } => 1,
        };

        Ok(Some(Self {
            handle: ticket.handle().clone(),
            document,
            page: saved.clamp(1, pages),
            pages,
            scale: session.reader_config().pdf_scale,
        }))
    }

    /// Handle of the open this reader belongs to.
    pub fn handle(&self) -> &ReaderHandle {
        &self.handle
    }

    /// Current page (1-indexed).
    pub fn page(&self) -> u32 {
        self.page
    }

    /// Number of pages.
    pub fn pages(&self) -> u32 {
        self.pages
    }

    /// Render the current page.
    pub async fn render(&mut self) -> Result<u32> {
        self.document.render_page(self.page, self.scale).await?;
        Ok(self.page)
    }

    /// Write the current page into the book's progress.
    ///
    /// Returns `false` if the reader has been closed or switched away from,
    /// or the page was already saved.
    pub fn commit(&self, session: &mut LibrarySession) -> Result<bool> {
        session.record_page(&self.handle, self.page)
    }

    /// Move by `delta` pages, clamped to the document, and render the result.
    ///
    /// Returns `false` if the page did not change.
    pub async fn turn(&mut self, delta: i64) -> Result<bool> {
        let target = (i64::from(self.page) + delta).clamp(1, i64::from(self.pages));
        // Clamped to [1, pages], so it fits.
        self.go_to(target as u32).await
    }

    /// Jump to a page, clamped to the document, and render it.
    ///
    /// The page stays where it was if rendering fails. Returns `false` if the
    /// page did not change.
    pub async fn go_to(&mut self, page: u32) -> Result<bool> {
        let target = page.clamp(1, self.pages);
        if target == self.page {
            return Ok(false);
        }

        let previous = std::mem::replace(&mut self.page, target);
        if let Err(e) = self.render().await {
            self.page = previous;
            return Err(e);
        }
        Ok(true)
    }
}
