use crate::error::Result;
use crate::reader::{EpubRendition, Loaded};
use crate::session::{LibrarySession, ReaderHandle};

/// Locator-based controller for an open EPUB.
pub struct EpubReader<R> {
    handle: ReaderHandle,
    rendition: R,
}

impl<R: EpubRendition> EpubReader<R> {
    /// Attach a displayed rendition to the session.
    ///
    /// Returns `Ok(None)` if the user moved on while the engine worked.
    pub fn attach(session: &mut LibrarySession, loaded: Loaded<R>) -> Result<Option<Self>> {
        Ok(loaded
            .settle(session)?
            .map(|(ticket, rendition)| Self {
                handle: ticket.handle().clone(),
                rendition,
            }))
    }

    /// Handle of the open this reader belongs to.
    pub fn handle(&self) -> &ReaderHandle {
        &self.handle
    }

    /// The engine reported a new position.
    ///
    /// Empty locators are ignored. Returns `true` if progress was updated.
    pub fn relocated(&self, session: &mut LibrarySession, locator: &str) -> Result<bool> {
        session.record_locator(&self.handle, locator)
    }

    /// Next screen; the engine reports the new position via `relocated`.
    pub fn next(&mut self) {
        self.rendition.next();
    }

    /// Previous screen.
    pub fn prev(&mut self) {
        self.rendition.prev();
    }
}
