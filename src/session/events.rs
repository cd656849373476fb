use crate::library::Book;

/// Counts from an import, for notices and logs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    /// Books new to this device.
    pub added: usize,
    /// Local books replaced by the imported record.
    pub updated: usize,
    /// Local books that were newer than the imported record.
    pub kept: usize,
    /// Library size after the merge.
    pub total: usize,
}

/// What changed in the library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LibraryChange {
    /// Books were uploaded.
    Added {
        /// Ids of the new books, in library order.
        ids: Vec<String>,
    },
    /// A book was removed.
    Removed {
        /// Id of the removed book.
        id: String,
        /// Its title, for the notice.
        title: String,
    },
    /// A book's reading position changed.
    Progress {
        /// Id of the book.
        id: String,
    },
    /// A sync code was merged into the library.
    Imported(ImportSummary),
}

impl LibraryChange {
    /// Short notification text, if this change deserves one.
    pub fn notice(&self) -> Option<String> {
        match self {
            LibraryChange::Added { ids } => {
                let count = ids.len();
                Some(format!(
                    "{} book{} added",
                    count,
                    if count == 1 { "" } else { "s" }
                ))
            }
            LibraryChange::Removed { title, .. } => Some(format!("Removed “{}”", title)),
            LibraryChange::Progress { .. } => None,
            LibraryChange::Imported(summary) => Some(format!(
                "Library synced: {} added, {} updated",
                summary.added, summary.updated
            )),
        }
    }
}

/// Receives the library after every change.
///
/// Called once the mutation is complete and a store write has been attempted.
/// A failed write is still notified, since the in-memory library did change;
/// the action that caused it returns the store error.
pub trait LibraryObserver {
    /// React to a change; `books` is the whole collection in display order.
    fn library_changed(&mut self, change: &LibraryChange, books: &[Book]);
}

impl<F> LibraryObserver for F
where
    F: FnMut(&LibraryChange, &[Book]),
{
    fn library_changed(&mut self, change: &LibraryChange, books: &[Book]) {
        self(change, books)
    }
}
