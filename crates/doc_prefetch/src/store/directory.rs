use super::{RecordCursor, RecordStore};
use anyhow::{ensure, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;
use walkdir::WalkDir;

/// A record store over a directory of one-record-per-file JSON documents.
///
/// Files are discovered recursively and ordered by path, so the filename is
/// the entry key. The file list is captured at `open` time; files added or
/// removed afterwards are not seen by existing cursors.
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    files: Arc<Vec<PathBuf>>,
}

impl DirectoryStore {
    /// Opens a directory for reading, collecting every `.json` file under it.
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        let mut files = Vec::new();
        for entry in WalkDir::new(root).min_depth(1) {
            let entry = entry.with_context(|| format!("failed to scan {}", root.display()))?;
            if entry.file_type().is_file()
                && entry.path().extension().is_some_and(|ext| ext == "json")
            {
                files.push(entry.into_path());
            }
        }
        files.sort();
        ensure!(
            !files.is_empty(),
            "no record files found under {}",
            root.display()
        );
        debug!(root = %root.display(), entries = files.len(), "opened directory store");
        Ok(Self {
            files: Arc::new(files),
        })
    }
}

impl RecordStore for DirectoryStore {
    fn new_cursor(&self) -> Result<Box<dyn RecordCursor>> {
        Ok(Box::new(DirectoryCursor {
            files: self.files.clone(),
            pos: 0,
        }))
    }

    fn entry_count(&self) -> Option<usize> {
        Some(self.files.len())
    }
}

struct DirectoryCursor {
    files: Arc<Vec<PathBuf>>,
    pos: usize,
}

impl RecordCursor for DirectoryCursor {
    fn value(&self) -> Result<Vec<u8>> {
        ensure!(self.valid(), "cursor is past the end of the store");
        let path = &self.files[self.pos];
        fs::read(path).with_context(|| format!("failed to read {}", path.display()))
    }

    fn key(&self) -> Result<Vec<u8>> {
        ensure!(self.valid(), "cursor is past the end of the store");
        Ok(self.files[self.pos]
            .to_string_lossy()
            .into_owned()
            .into_bytes())
    }

    fn next(&mut self) {
        if self.pos < self.files.len() {
            self.pos += 1;
        }
    }

    fn valid(&self) -> bool {
        self.pos < self.files.len()
    }

    fn seek_to_first(&mut self) {
        self.pos = 0;
    }
}
