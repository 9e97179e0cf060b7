//! Walk policy: which directories to enter and which files to scan.
//!
//! Everything here is a pure predicate over paths; rejected paths are skipped silently.

use std::path::{Component, Path, PathBuf};

/// Directory names never descended into.
pub const RESERVED_DIRS: &[&str] = &[".", "..", ".git", ".svn", ".hg"];

#[derive(Debug, Clone, Default)]
pub struct FilterPolicy {
    excludes: Vec<PathBuf>,
    extensions: Vec<String>,
    specific_files: Vec<String>,
    follow_symlinks: bool,
    raw: bool,
}

impl FilterPolicy {
    pub fn new<E, F>(extensions: E, specific_files: F) -> Self
    where
        E: IntoIterator,
        E::Item: AsRef<str>,
        F: IntoIterator,
        F::Item: AsRef<str>,
    {
        let mut policy = Self::default();
        for ext in extensions {
            policy.add_extension(ext.as_ref());
        }
        policy.specific_files = specific_files
            .into_iter()
            .map(|f| f.as_ref().to_string())
            .filter(|f| !f.is_empty())
            .collect();
        policy
    }

    /// Extensions are stored with a leading dot (`c` and `.c` are the same entry).
    pub fn add_extension(&mut self, ext: &str) {
        let ext = ext.trim();
        if ext.is_empty() {
            return;
        }
        let ext = if ext.starts_with('.') {
            ext.to_string()
        } else {
            format!(".{ext}")
        };
        if !self.extensions.contains(&ext) {
            self.extensions.push(ext);
        }
    }

    pub fn add_exclude(&mut self, dir: &str) {
        let normalized = normalize(Path::new(dir));
        if normalized.as_os_str().is_empty() {
            return;
        }
        self.excludes.push(normalized);
    }

    pub fn with_raw(mut self, raw: bool) -> Self {
        self.raw = raw;
        self
    }

    pub fn with_follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self
    }

    pub fn raw(&self) -> bool {
        self.raw
    }

    pub fn follow_symlinks(&self) -> bool {
        self.follow_symlinks
    }

    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    /// Reserved VCS names are rejected by name; excludes match when the directory
    /// path ends with the exclude's components (so `build` and `src/build` both work).
    pub fn should_descend(&self, dir: &Path) -> bool {
        if let Some(name) = dir.file_name().and_then(|n| n.to_str()) {
            if RESERVED_DIRS.contains(&name) {
                return false;
            }
        }
        if self.excludes.is_empty() {
            return true;
        }
        let dir = normalize(dir);
        !self.excludes.iter().any(|ex| dir.ends_with(ex))
    }

    pub fn should_scan(&self, file: &Path) -> bool {
        if self.raw {
            return true;
        }
        if let Some(name) = file.file_name().and_then(|n| n.to_str()) {
            if self.specific_files.iter().any(|s| s == name) {
                return true;
            }
        }
        let path = file.to_string_lossy();
        self.extensions.iter().any(|ext| path.ends_with(ext.as_str()))
    }

    pub fn allows_symlink(&self, is_symlink: bool) -> bool {
        !is_symlink || self.follow_symlinks
    }
}

/// Drop `.` components and trailing separators.
fn normalize(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}
