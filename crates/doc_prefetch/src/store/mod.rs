//! Key-ordered record store interface.
//!
//! The pipeline reads through this seam: a [`RecordStore`] yields
//! [`RecordCursor`]s that walk entries in key order, wrap around via
//! `seek_to_first`, and may or may not know how many entries they hold
//! (some backends can only answer by scanning, and report `None` instead).
//!
//! Two concrete stores ship with the crate: [`InMemoryStore`] for tests and
//! small fixtures, and [`DirectoryStore`] for one-record-per-file layouts.

mod directory;
mod memory;

pub use directory::DirectoryStore;
pub use memory::InMemoryStore;

use anyhow::Result;

/// A cursor positioned inside a record store.
///
/// A freshly created cursor sits on the first entry (when one exists).
/// After `next()` moves past the last entry the cursor reports
/// `valid() == false` until `seek_to_first()` rewinds it.
pub trait RecordCursor: Send {
    /// Bytes of the entry under the cursor. Fails when the cursor is not
    /// valid or the entry cannot be read.
    fn value(&self) -> Result<Vec<u8>>;

    /// Key of the entry under the cursor. Fails when the cursor is not valid.
    fn key(&self) -> Result<Vec<u8>>;

    /// Advances to the next entry in key order.
    fn next(&mut self);

    /// Whether the cursor currently points at an entry.
    fn valid(&self) -> bool;

    /// Rewinds to the first entry.
    fn seek_to_first(&mut self);
}

/// A read-only, key-ordered record store.
pub trait RecordStore: Send {
    /// Opens a new independent cursor over the store.
    fn new_cursor(&self) -> Result<Box<dyn RecordCursor>>;

    /// Number of entries, or `None` when the backend cannot report one
    /// without a full scan.
    fn entry_count(&self) -> Option<usize>;
}
