use aho_corasick::AhoCorasick;
use memchr::memmem;
use regex::bytes::{Regex, RegexBuilder};
use std::borrow::Cow;
use thiserror::Error;

/// Stored match text is cut to this many bytes.
pub const MAX_LINE_LEN: usize = 512;
/// Longest prefix of a physical line that is read and matched; the rest is skipped.
pub const MAX_READ_LEN: usize = 64 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatcherKind {
    Plain,
    CaseInsensitive,
    Regex,
}

#[derive(Debug, Error)]
pub enum MatcherError {
    #[error("bad regexp '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error("cannot build matcher for '{pattern}': {source}")]
    Automaton {
        pattern: String,
        #[source]
        source: aho_corasick::BuildError,
    },
}

/// Per-line matching strategy, chosen once per search.
#[derive(Debug, Clone)]
pub enum LineMatcher {
    Plain(memmem::Finder<'static>),
    CaseInsensitive(AhoCorasick),
    Regex(Regex),
}

impl LineMatcher {
    /// `regex` wins over `ignore_case`; with both, the regex is compiled case-insensitive.
    pub fn new(pattern: &str, ignore_case: bool, regex: bool) -> Result<Self, MatcherError> {
        if regex {
            return Self::regex(pattern, ignore_case);
        }
        if ignore_case {
            let automaton = AhoCorasick::builder()
                .ascii_case_insensitive(true)
                .build([pattern])
                .map_err(|source| MatcherError::Automaton {
                    pattern: pattern.to_string(),
                    source,
                })?;
            return Ok(LineMatcher::CaseInsensitive(automaton));
        }
        Ok(LineMatcher::Plain(
            memmem::Finder::new(pattern.as_bytes()).into_owned(),
        ))
    }

    pub fn regex(pattern: &str, ignore_case: bool) -> Result<Self, MatcherError> {
        RegexBuilder::new(pattern)
            .case_insensitive(ignore_case)
            .build()
            .map(LineMatcher::Regex)
            .map_err(|source| MatcherError::InvalidPattern {
                pattern: pattern.to_string(),
                source,
            })
    }

    pub fn kind(&self) -> MatcherKind {
        match self {
            LineMatcher::Plain(_) => MatcherKind::Plain,
            LineMatcher::CaseInsensitive(_) => MatcherKind::CaseInsensitive,
            LineMatcher::Regex(_) => MatcherKind::Regex,
        }
    }

    pub fn matches(&self, line: &[u8]) -> bool {
        match self {
            LineMatcher::Plain(finder) => finder.find(line).is_some(),
            LineMatcher::CaseInsensitive(ac) => ac.is_match(line),
            LineMatcher::Regex(re) => re.is_match(line),
        }
    }
}

/// Drop the trailing `\n` and an optional `\r` before it.
pub fn strip_line_ending(mut line: &[u8]) -> &[u8] {
    if let Some(rest) = line.strip_suffix(b"\n") {
        line = rest;
    }
    if let Some(rest) = line.strip_suffix(b"\r") {
        line = rest;
    }
    line
}

/// Decode a matched line for storage, cut to [`MAX_LINE_LEN`] bytes on a char boundary.
pub fn stored_text(line: &[u8]) -> String {
    let text: Cow<'_, str> = String::from_utf8_lossy(line);
    if text.len() <= MAX_LINE_LEN {
        return text.into_owned();
    }
    let mut end = MAX_LINE_LEN;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    text[..end].to_string()
}
