use super::{RecordCursor, RecordStore};
use anyhow::{ensure, Result};
use std::sync::Arc;

/// A record store backed by a sorted in-memory key/value list.
///
/// Entries are sorted by key at construction so cursor order matches what a
/// real key-ordered backend would produce. Cloning the store is cheap; the
/// entry list is shared behind an `Arc`.
///
/// # Example
/// ```ignore
/// let store = InMemoryStore::new(vec![
///     (b"a".to_vec(), record_a.to_bytes()?),
///     (b"b".to_vec(), record_b.to_bytes()?),
/// ]);
/// let mut cursor = store.new_cursor()?;
/// assert!(cursor.valid());
/// ```
#[derive(Debug, Clone)]
pub struct InMemoryStore {
    entries: Arc<Vec<(Vec<u8>, Vec<u8>)>>,
    report_count: bool,
}

impl InMemoryStore {
    pub fn new(mut entries: Vec<(Vec<u8>, Vec<u8>)>) -> Self {
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        Self {
            entries: Arc::new(entries),
            report_count: true,
        }
    }

    /// Makes `entry_count()` return `None`, mimicking backends that cannot
    /// count entries without a full scan.
    pub fn hide_entry_count(mut self) -> Self {
        self.report_count = false;
        self
    }
}

impl RecordStore for InMemoryStore {
    fn new_cursor(&self) -> Result<Box<dyn RecordCursor>> {
        Ok(Box::new(MemoryCursor {
            entries: self.entries.clone(),
            pos: 0,
        }))
    }

    fn entry_count(&self) -> Option<usize> {
        self.report_count.then(|| self.entries.len())
    }
}

struct MemoryCursor {
    entries: Arc<Vec<(Vec<u8>, Vec<u8>)>>,
    pos: usize,
}

impl RecordCursor for MemoryCursor {
    fn value(&self) -> Result<Vec<u8>> {
        ensure!(self.valid(), "cursor is past the end of the store");
        Ok(self.entries[self.pos].1.clone())
    }

    fn key(&self) -> Result<Vec<u8>> {
        ensure!(self.valid(), "cursor is past the end of the store");
        Ok(self.entries[self.pos].0.clone())
    }

    fn next(&mut self) {
        if self.pos < self.entries.len() {
            self.pos += 1;
        }
    }

    fn valid(&self) -> bool {
        self.pos < self.entries.len()
    }

    fn seek_to_first(&mut self) {
        self.pos = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(key: &str, value: &str) -> (Vec<u8>, Vec<u8>) {
        (key.as_bytes().to_vec(), value.as_bytes().to_vec())
    }

    #[test]
    fn cursor_walks_entries_in_key_order() -> Result<()> {
        let store = InMemoryStore::new(vec![entry("b", "2"), entry("a", "1"), entry("c", "3")]);
        let mut cursor = store.new_cursor()?;

        let mut seen = Vec::new();
        while cursor.valid() {
            seen.push(String::from_utf8(cursor.value()?).unwrap());
            cursor.next();
        }
        assert_eq!(seen, vec!["1", "2", "3"]);
        assert!(cursor.value().is_err());

        cursor.seek_to_first();
        assert_eq!(cursor.key()?, b"a".to_vec());
        Ok(())
    }

    #[test]
    fn entry_count_can_be_hidden() {
        let store = InMemoryStore::new(vec![entry("a", "1")]);
        assert_eq!(store.entry_count(), Some(1));
        assert_eq!(store.hide_entry_count().entry_count(), None);
    }

    #[test]
    fn empty_store_yields_invalid_cursor() -> Result<()> {
        let store = InMemoryStore::new(Vec::new());
        let cursor = store.new_cursor()?;
        assert!(!cursor.valid());
        assert!(cursor.value().is_err());
        Ok(())
    }
}
