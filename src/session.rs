//! Search contexts and the stack of nested searches.
//!
//! The primary context is fed by the background walker; each subsearch is a frozen,
//! filtered copy of its parent. The current context is always the top of the stack,
//! and the parent of a subsearch is simply the entry below it.

use crate::buffer::{self, BufferError, ResultBuffer, SharedBuffer};
use crate::filter::FilterPolicy;
use crate::matcher::{LineMatcher, MatcherKind};
use crate::navigation::Navigator;
use crate::subsearch::{self, SubsearchError};
use crate::walker::{FailureSlot, Walker};
use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

/// Fully resolved primary search parameters from CLI args and config.
#[derive(Debug, Clone)]
pub struct SearchParams {
    pub pattern: String,
    pub root: PathBuf,
    pub ignore_case: bool,
    pub regex: bool,
    pub policy: FilterPolicy,
}

pub struct SearchContext {
    pattern: String,
    matcher: Arc<LineMatcher>,
    ignore_case: bool,
    root: PathBuf,
    raw: bool,
    buffer: SharedBuffer,
    live: Arc<AtomicBool>,
    pub nav: Navigator,
}

impl SearchContext {
    fn primary(params: &SearchParams, matcher: LineMatcher) -> Self {
        Self {
            pattern: params.pattern.clone(),
            matcher: Arc::new(matcher),
            ignore_case: params.ignore_case,
            root: params.root.clone(),
            raw: params.policy.raw(),
            buffer: ResultBuffer::default().into_shared(),
            live: Arc::new(AtomicBool::new(true)),
            nav: Navigator::default(),
        }
    }

    fn child(&self, pattern: &str, matcher: LineMatcher, rows: ResultBuffer) -> Self {
        Self {
            pattern: pattern.to_string(),
            matcher: Arc::new(matcher),
            ignore_case: self.ignore_case,
            root: self.root.clone(),
            raw: false,
            buffer: rows.into_shared(),
            live: Arc::new(AtomicBool::new(false)),
            nav: Navigator::default(),
        }
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn kind(&self) -> MatcherKind {
        self.matcher.kind()
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn raw(&self) -> bool {
        self.raw
    }

    pub fn buffer(&self) -> &SharedBuffer {
        &self.buffer
    }

    /// True while the background walk is still producing rows.
    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::Acquire)
    }

    pub fn hits(&self) -> usize {
        buffer::lock(&self.buffer).hits()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopOutcome {
    Popped,
    EndSession,
}

pub struct Session {
    primary: SearchContext,
    subsearches: Vec<SearchContext>,
    failure: FailureSlot,
    walker: Option<JoinHandle<()>>,
}

impl Session {
    /// Compile the pattern and create the primary context. No walker is attached yet,
    /// so an invalid pattern is reported before anything touches the filesystem.
    pub fn prepare(params: &SearchParams) -> Result<Self> {
        let matcher = LineMatcher::new(&params.pattern, params.ignore_case, params.regex)?;
        Ok(Self {
            primary: SearchContext::primary(params, matcher),
            subsearches: Vec::new(),
            failure: FailureSlot::default(),
            walker: None,
        })
    }

    /// Start the background walk feeding the primary context. A failed thread spawn is fatal.
    pub fn spawn_walker(&mut self, policy: FilterPolicy) -> Result<()> {
        let primary = &self.primary;
        info!(
            "searching '{}' under {} ({:?}{})",
            primary.pattern(),
            primary.root().display(),
            primary.kind(),
            if primary.raw() { ", raw" } else { "" }
        );
        let handle = self
            .walker_for(policy)
            .spawn()
            .context("cannot start background walk")?;
        self.walker = Some(handle);
        Ok(())
    }

    fn walker_for(&self, policy: FilterPolicy) -> Walker {
        Walker::new(
            self.primary.root.clone(),
            Arc::new(policy),
            Arc::clone(&self.primary.matcher),
            Arc::clone(&self.primary.buffer),
            Arc::clone(&self.primary.live),
            Arc::clone(&self.failure),
        )
    }

    pub fn primary(&self) -> &SearchContext {
        &self.primary
    }

    pub fn current(&self) -> &SearchContext {
        self.subsearches.last().unwrap_or(&self.primary)
    }

    pub fn current_mut(&mut self) -> &mut SearchContext {
        self.subsearches.last_mut().unwrap_or(&mut self.primary)
    }

    /// Number of subsearches stacked on the primary.
    pub fn depth(&self) -> usize {
        self.subsearches.len()
    }

    /// Patterns from the primary search down to the current one.
    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        std::iter::once(&self.primary)
            .chain(&self.subsearches)
            .map(SearchContext::pattern)
    }

    /// Filter the current context by `pattern` and make the result current.
    /// An empty pattern is a cancelled prompt: nothing happens and `Ok(false)` is returned.
    /// On error the stack is untouched.
    pub fn push_subsearch(&mut self, pattern: &str) -> Result<bool, SubsearchError> {
        if pattern.is_empty() {
            return Ok(false);
        }
        let parent = self.current();
        let (matcher, rows) = subsearch::build(&parent.buffer, pattern, parent.ignore_case)?;
        info!(
            "subsearch '{}' kept {} of {} hits",
            pattern,
            rows.hits(),
            parent.hits()
        );
        let child = parent.child(pattern, matcher, rows);
        self.subsearches.push(child);
        Ok(true)
    }

    /// Drop the current subsearch and return to its parent, or ask to end the
    /// session when the primary is current.
    pub fn pop_current(&mut self) -> PopOutcome {
        match self.subsearches.pop() {
            Some(ctx) => {
                debug!("leaving subsearch '{}'", ctx.pattern);
                PopOutcome::Popped
            }
            None => PopOutcome::EndSession,
        }
    }

    /// Release every context from the current one back to the primary.
    /// A still running walk is left to finish on its own; the process exit ends it.
    pub fn teardown_all(mut self) {
        while let Some(ctx) = self.subsearches.pop() {
            debug!("releasing subsearch '{}'", ctx.pattern);
        }
        {
            let rows = buffer::lock(&self.primary.buffer);
            debug!(
                "releasing primary search ({} hits in {} rows, {} allocated, walk {})",
                rows.hits(),
                rows.len(),
                rows.capacity(),
                if self.primary.is_live() { "running" } else { "done" }
            );
        }
        if let Some(handle) = self.walker.take() {
            if handle.is_finished() && handle.join().is_err() {
                warn!("walker thread panicked");
            }
        }
    }

    /// A fatal error raised by the walker, if any.
    pub fn take_walk_error(&self) -> Option<BufferError> {
        self.failure.lock().unwrap_or_else(|e| e.into_inner()).take()
    }

    /// The walk is over and found nothing at all.
    pub fn is_finished_empty(&self) -> bool {
        !self.primary.is_live() && buffer::lock(&self.primary.buffer).is_empty()
    }

    #[cfg(test)]
    fn run_walk_inline(&self, policy: FilterPolicy) {
        self.walker_for(policy).run().unwrap();
        self.primary.live.store(false, Ordering::Release);
    }
}
