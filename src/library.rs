pub mod book;
pub mod identity;

pub use book::{Book, Progress};
pub use identity::{RawBook, merge_key, normalize};

/// Library counts shown in the header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LibraryStats {
    /// Number of books.
    pub total: usize,
    /// Number of PDF books.
    pub pdf: usize,
    /// Number of EPUB books.
    pub epub: usize,
}

impl LibraryStats {
    /// Count the books of each format.
    pub fn of(books: &[Book]) -> Self {
        books.iter().fold(Self::default(), |mut stats, book| {
            stats.total += 1;
            match book.progress {
                Progress::Pdf { .. } => stats.pdf += 1,
                Progress::Epub { .. } => stats.epub += 1,
            }
            stats
        })
    }
}
