//! Append-only result buffer shared between the walker and the UI.
//!
//! Rows are either a file header or one matching line of that file. A header is only
//! ever appended together with the first match of its file, so a reader holding the
//! lock never sees a header that will stay empty.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

/// Slots reserved up front for every buffer.
pub const INITIAL_CAPACITY: usize = 100;
/// Growth step used by the primary (filesystem) walk.
pub const WALK_GROWTH: usize = 500;
/// Growth step used while building a subsearch.
pub const SUBSEARCH_GROWTH: usize = 100;

pub type SharedBuffer = Arc<Mutex<ResultBuffer>>;

/// Lock a shared buffer; a poisoned lock still yields the data (rows are append-only).
pub fn lock(buffer: &SharedBuffer) -> MutexGuard<'_, ResultBuffer> {
    buffer.lock().unwrap_or_else(|e| e.into_inner())
}

/// One row of a result set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    FileHeader { path: PathBuf },
    MatchLine { line_number: usize, text: String },
}

impl Entry {
    pub fn is_header(&self) -> bool {
        matches!(self, Entry::FileHeader { .. })
    }
}

#[derive(Debug, Error)]
pub enum BufferError {
    #[error("out of memory while growing result buffer to {requested} entries")]
    Exhausted { requested: usize },
}

#[derive(Debug)]
pub struct ResultBuffer {
    entries: Vec<Entry>,
    hits: usize,
    growth: usize,
}

impl Default for ResultBuffer {
    fn default() -> Self {
        Self::with_growth(WALK_GROWTH)
    }
}

impl ResultBuffer {
    pub fn with_growth(growth: usize) -> Self {
        Self {
            entries: Vec::with_capacity(INITIAL_CAPACITY),
            hits: 0,
            growth: growth.max(1),
        }
    }

    pub fn into_shared(self) -> SharedBuffer {
        Arc::new(Mutex::new(self))
    }

    /// Grow by one fixed step when the next `extra` rows would not fit.
    fn reserve_for(&mut self, extra: usize) -> Result<(), BufferError> {
        if self.entries.len() + extra <= self.entries.capacity() {
            return Ok(());
        }
        let step = self.growth.max(extra);
        self.entries
            .try_reserve_exact(step)
            .map_err(|_| BufferError::Exhausted {
                requested: self.entries.len() + step,
            })
    }

    /// Append a bare header. Callers must follow it with at least one match before
    /// releasing the lock; the walker uses [`append_file_match`](Self::append_file_match).
    pub fn append_file(&mut self, path: &Path) -> Result<(), BufferError> {
        self.reserve_for(1)?;
        self.entries.push(Entry::FileHeader {
            path: path.to_path_buf(),
        });
        Ok(())
    }

    pub fn append_match(&mut self, line_number: usize, text: String) -> Result<(), BufferError> {
        self.reserve_for(1)?;
        self.entries.push(Entry::MatchLine { line_number, text });
        self.hits += 1;
        Ok(())
    }

    /// Header plus first match in one step.
    pub fn append_file_match(
        &mut self,
        path: &Path,
        line_number: usize,
        text: String,
    ) -> Result<(), BufferError> {
        self.reserve_for(2)?;
        self.append_file(path)?;
        self.append_match(line_number, text)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.entries.capacity()
    }

    /// Number of match rows (the "Hits: N" counter).
    pub fn hits(&self) -> usize {
        self.hits
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn get(&self, index: usize) -> Option<&Entry> {
        self.entries.get(index)
    }

    /// Index of the header owning the row at `index`.
    pub fn owning_header(&self, index: usize) -> Option<usize> {
        if index >= self.entries.len() {
            return None;
        }
        (0..=index).rev().find(|&i| self.entries[i].is_header())
    }

    /// Path and line number for the match row at `index`.
    pub fn locate(&self, index: usize) -> Option<(&Path, usize)> {
        let line_number = match self.entries.get(index)? {
            Entry::MatchLine { line_number, .. } => *line_number,
            Entry::FileHeader { .. } => return None,
        };
        match &self.entries[self.owning_header(index)?] {
            Entry::FileHeader { path } => Some((path.as_path(), line_number)),
            Entry::MatchLine { .. } => None,
        }
    }

    pub fn shrink_to_fit(&mut self) {
        self.entries.shrink_to_fit();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ResultBuffer {
        let mut buf = ResultBuffer::default();
        buf.append_file_match(Path::new("a.c"), 3, "foo(x)".into())
            .unwrap();
        buf.append_match(7, "foo(y)".into()).unwrap();
        buf.append_file_match(Path::new("b.c"), 1, "foo".into())
            .unwrap();
        buf
    }

    #[test]
    fn header_and_first_match_are_appended_together() {
        let buf = sample();
        assert_eq!(buf.len(), 5);
        assert_eq!(buf.hits(), 3);
        assert!(buf.entries()[0].is_header());
        assert_eq!(
            buf.entries()[1],
            Entry::MatchLine {
                line_number: 3,
                text: "foo(x)".into()
            }
        );
        assert!(buf.entries()[3].is_header());
    }

    #[test]
    fn owning_header_walks_back_to_file() {
        let buf = sample();
        assert_eq!(buf.owning_header(2), Some(0));
        assert_eq!(buf.owning_header(4), Some(3));
        assert_eq!(buf.owning_header(3), Some(3));
        assert_eq!(buf.owning_header(99), None);
    }

    #[test]
    fn locate_resolves_path_and_line() {
        let buf = sample();
        assert_eq!(buf.locate(2), Some((Path::new("a.c"), 7)));
        assert_eq!(buf.locate(4), Some((Path::new("b.c"), 1)));
        assert_eq!(buf.locate(0), None);
    }

    #[test]
    fn grows_by_fixed_step_when_full() {
        let mut buf = ResultBuffer::with_growth(500);
        let start = buf.capacity();
        assert!(start >= INITIAL_CAPACITY);
        buf.append_file(Path::new("big.c")).unwrap();
        for n in 0..start {
            buf.append_match(n + 1, String::new()).unwrap();
        }
        assert!(buf.capacity() >= start + 500);
        assert_eq!(buf.hits(), start);
    }

    #[test]
    fn shrink_after_build() {
        let mut buf = sample();
        buf.shrink_to_fit();
        assert!(buf.capacity() < INITIAL_CAPACITY);
    }
}
