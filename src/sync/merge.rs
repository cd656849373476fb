//! Two-way reconciliation of book collections.
//!
//! Books are matched by [`merge_key`] and the most recently updated record
//! wins, with ties going to the incoming side. The local id of a matched book
//! is always kept so the rest of the session keeps pointing at it.
//!
//! The merge is only defined for two parties. Syncing three devices means two
//! sequential merges, and the outcome can depend on the order they are run in.

use crate::library::{Book, merge_key};
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// Result of a merge with per-book accounting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    /// Merged collection, most recently updated first.
    pub books: Vec<Book>,
    /// Incoming books that were not in the local library.
    pub added: usize,
    /// Local books replaced by a newer (or equally recent) incoming record.
    pub updated: usize,
    /// Local books kept because they were newer than the incoming record.
    pub kept: usize,
}

/// Merge `incoming` into `local`.
pub fn merge(local: Vec<Book>, incoming: Vec<Book>) -> Vec<Book> {
    merge_detailed(local, incoming).books
}

/// Merge `incoming` into `local`, reporting what happened to each book.
///
/// Books with equal `updated_at` keep the order in which their key was first
/// seen: local books in list order, then new incoming books.
pub fn merge_detailed(local: Vec<Book>, incoming: Vec<Book>) -> MergeOutcome {
    let mut slots: Vec<Book> = Vec::with_capacity(local.len() + incoming.len());
    let mut by_key: HashMap<String, usize> = HashMap::new();

    for book in local {
        match by_key.entry(merge_key(&book)) {
            // Last one wins, but the key keeps its first position.
            Entry::Occupied(slot) => slots[*slot.get()] = book,
            Entry::Vacant(slot) => {
                slot.insert(slots.len());
                slots.push(book);
            }
        }
    }

    let mut ids: HashSet<String> = slots.iter().map(|b| b.id.clone()).collect();
    let mut outcome = MergeOutcome::default();

    for mut book in incoming {
        match by_key.entry(merge_key(&book)) {
            Entry::Vacant(slot) => {
                // A foreign id may already name a different local book.
                if !ids.insert(book.id.clone()) {
                    book.id = Uuid::new_v4().to_string();
                    ids.insert(book.id.clone());
                }
                slot.insert(slots.len());
                slots.push(book);
                outcome.added += 1;
            }
            Entry::Occupied(slot) => {
                let existing = &mut slots[*slot.get()];
                if book.updated_at >= existing.updated_at {
                    book.id = std::mem::take(&mut existing.id);
                    *existing = book;
                    outcome.updated += 1;
                } else {
                    outcome.kept += 1;
                }
            }
        }
    }

    slots.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
    outcome.books = slots;
    outcome
}
