//! Background filesystem walk feeding the primary result buffer.

use crate::buffer::{self, BufferError, SharedBuffer};
use crate::filter::FilterPolicy;
use crate::matcher::{self, LineMatcher};
use log::{debug, error, info};
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use walkdir::WalkDir;

/// Slot where the walker leaves a fatal error for the UI to pick up.
pub type FailureSlot = Arc<Mutex<Option<BufferError>>>;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WalkStats {
    pub files_scanned: usize,
    pub files_matched: usize,
}

pub struct Walker {
    root: PathBuf,
    policy: Arc<FilterPolicy>,
    matcher: Arc<LineMatcher>,
    buffer: SharedBuffer,
    live: Arc<AtomicBool>,
    failure: FailureSlot,
}

/// Clears the liveness flag however the walk ends.
struct LiveGuard(Arc<AtomicBool>);

impl Drop for LiveGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Walker {
    pub fn new(
        root: PathBuf,
        policy: Arc<FilterPolicy>,
        matcher: Arc<LineMatcher>,
        buffer: SharedBuffer,
        live: Arc<AtomicBool>,
        failure: FailureSlot,
    ) -> Self {
        Self {
            root,
            policy,
            matcher,
            buffer,
            live,
            failure,
        }
    }

    /// Run the walk on its own thread. The liveness flag must already be set.
    pub fn spawn(self) -> io::Result<JoinHandle<()>> {
        thread::Builder::new()
            .name("ngp-walker".into())
            .spawn(move || {
                let _live = LiveGuard(Arc::clone(&self.live));
                info!("walk started at {}", self.root.display());
                match self.run() {
                    Ok(stats) => info!(
                        "walk done: {} files scanned, {} with matches",
                        stats.files_scanned, stats.files_matched
                    ),
                    Err(err) => {
                        error!("walk aborted: {err}");
                        *self.failure.lock().unwrap_or_else(|e| e.into_inner()) = Some(err);
                    }
                }
            })
    }

    /// Walk synchronously. Only buffer growth failures abort; everything else is skipped.
    pub fn run(&self) -> Result<WalkStats, BufferError> {
        let mut stats = WalkStats::default();
        if self.root.is_file() {
            self.scan(&self.root, &mut stats)?;
            return Ok(stats);
        }

        let policy = &self.policy;
        let entries = WalkDir::new(&self.root)
            .follow_links(policy.follow_symlinks())
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| {
                e.depth() == 0 || !e.file_type().is_dir() || policy.should_descend(e.path())
            });

        for entry in entries {
            let entry = match entry {
                Ok(e) => e,
                Err(err) => {
                    debug!("skip: {err}");
                    continue;
                }
            };
            if entry.depth() == 0 || !entry.file_type().is_file() {
                continue;
            }
            if !policy.allows_symlink(entry.path_is_symlink()) || !policy.should_scan(entry.path())
            {
                continue;
            }
            self.scan(entry.path(), &mut stats)?;
        }
        Ok(stats)
    }

    fn scan(&self, path: &Path, stats: &mut WalkStats) -> Result<(), BufferError> {
        let file = match File::open(path) {
            Ok(f) => f,
            Err(err) => {
                debug!("skip {}: {err}", path.display());
                return Ok(());
            }
        };
        stats.files_scanned += 1;
        if scan_reader(BufReader::new(file), path, &self.matcher, &self.buffer)? {
            stats.files_matched += 1;
        }
        Ok(())
    }
}

/// Scan `reader` line by line, appending hits under `path`. Returns whether anything matched.
/// Only the first [`MAX_READ_LEN`](matcher::MAX_READ_LEN) bytes of a line are read and
/// matched; the remainder is skipped so line numbers stay right.
pub fn scan_reader<R: BufRead>(
    mut reader: R,
    path: &Path,
    matcher: &LineMatcher,
    target: &SharedBuffer,
) -> Result<bool, BufferError> {
    let mut line = Vec::new();
    let mut line_number = 0usize;
    let mut matched = false;

    loop {
        line.clear();
        let limit = matcher::MAX_READ_LEN as u64;
        let read = match reader.by_ref().take(limit).read_until(b'\n', &mut line) {
            Ok(0) => break,
            Ok(n) => n,
            Err(err) => {
                debug!("read error in {}: {err}", path.display());
                break;
            }
        };
        line_number += 1;
        if read == matcher::MAX_READ_LEN && line.last() != Some(&b'\n') {
            if let Err(err) = skip_line(&mut reader) {
                debug!("read error in {}: {err}", path.display());
                break;
            }
        }

        let content = matcher::strip_line_ending(&line);
        if !matcher.matches(content) {
            continue;
        }
        let text = matcher::stored_text(content);
        let mut buf = buffer::lock(target);
        if matched {
            buf.append_match(line_number, text)?;
        } else {
            buf.append_file_match(path, line_number, text)?;
            matched = true;
        }
    }
    Ok(matched)
}

/// Discard input up to and including the next `\n`.
fn skip_line<R: BufRead>(reader: &mut R) -> io::Result<()> {
    loop {
        let (consumed, done) = {
            let available = reader.fill_buf()?;
            if available.is_empty() {
                return Ok(());
            }
            match memchr::memchr(b'\n', available) {
                Some(i) => (i + 1, true),
                None => (available.len(), false),
            }
        };
        reader.consume(consumed);
        if done {
            return Ok(());
        }
    }
}
