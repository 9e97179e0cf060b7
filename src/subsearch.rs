//! Search within search: filter an existing result set by a second pattern.

use crate::buffer::{self, BufferError, Entry, ResultBuffer, SharedBuffer, SUBSEARCH_GROWTH};
use crate::matcher::{LineMatcher, MatcherError};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SubsearchError {
    #[error(transparent)]
    Pattern(#[from] MatcherError),
    #[error(transparent)]
    Buffer(#[from] BufferError),
}

/// Compile `pattern` as a regex and filter a point-in-time view of `parent` with it.
/// The parent stays locked for the pass, so a running walk simply waits.
pub fn build(
    parent: &SharedBuffer,
    pattern: &str,
    ignore_case: bool,
) -> Result<(LineMatcher, ResultBuffer), SubsearchError> {
    let matcher = LineMatcher::regex(pattern, ignore_case)?;
    let child = {
        let parent = buffer::lock(parent);
        filter(&parent, &matcher)?
    };
    Ok((matcher, child))
}

/// Keep the match rows of `parent` accepted by `matcher`. A header is held back
/// until its first surviving match, so files left with no rows disappear.
pub fn filter(parent: &ResultBuffer, matcher: &LineMatcher) -> Result<ResultBuffer, BufferError> {
    let mut child = ResultBuffer::with_growth(SUBSEARCH_GROWTH);
    let mut pending: Option<&Path> = None;

    for entry in parent.entries() {
        match entry {
            Entry::FileHeader { path } => pending = Some(path),
            Entry::MatchLine { line_number, text } => {
                if !matcher.matches(text.as_bytes()) {
                    continue;
                }
                match pending.take() {
                    Some(path) => child.append_file_match(path, *line_number, text.clone())?,
                    None => child.append_match(*line_number, text.clone())?,
                }
            }
        }
    }

    child.shrink_to_fit();
    Ok(child)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parent() -> ResultBuffer {
        let mut buf = ResultBuffer::default();
        buf.append_file_match(Path::new("a.c"), 3, "foo(x)".into())
            .unwrap();
        buf.append_match(9, "foo(y)".into()).unwrap();
        buf.append_file_match(Path::new("b.c"), 1, "foo(y)".into())
            .unwrap();
        buf.append_file_match(Path::new("c.c"), 4, "foo(z)".into())
            .unwrap();
        buf.append_match(5, "foo(yy)".into()).unwrap();
        buf
    }

    #[test]
    fn keeps_only_matching_rows_and_their_headers() {
        let child = filter(&parent(), &LineMatcher::regex("y", false).unwrap()).unwrap();
        assert_eq!(
            child.entries(),
            &[
                Entry::FileHeader {
                    path: "a.c".into()
                },
                Entry::MatchLine {
                    line_number: 9,
                    text: "foo(y)".into()
                },
                Entry::FileHeader {
                    path: "b.c".into()
                },
                Entry::MatchLine {
                    line_number: 1,
                    text: "foo(y)".into()
                },
                Entry::FileHeader {
                    path: "c.c".into()
                },
                Entry::MatchLine {
                    line_number: 5,
                    text: "foo(yy)".into()
                },
            ]
        );
        assert_eq!(child.hits(), 3);
    }

    #[test]
    fn orphan_headers_are_dropped() {
        let child = filter(&parent(), &LineMatcher::regex("z", false).unwrap()).unwrap();
        assert_eq!(child.len(), 2);
        assert_eq!(
            child.entries()[0],
            Entry::FileHeader {
                path: "c.c".into()
            }
        );
    }

    #[test]
    fn result_is_contained_in_parent() {
        let parent = parent();
        let matcher = LineMatcher::regex(r"\(y+\)", false).unwrap();
        let child = filter(&parent, &matcher).unwrap();
        for (i, entry) in child.entries().iter().enumerate() {
            match entry {
                Entry::MatchLine { text, .. } => {
                    assert!(parent.entries().contains(entry));
                    assert!(matcher.matches(text.as_bytes()));
                }
                Entry::FileHeader { .. } => {
                    assert!(matches!(
                        child.entries().get(i + 1),
                        Some(Entry::MatchLine { .. })
                    ));
                }
            }
        }
    }

    #[test]
    fn line_number_prefix_is_not_searched() {
        let child = filter(&parent(), &LineMatcher::regex("^3", false).unwrap()).unwrap();
        assert!(child.is_empty());
    }

    #[test]
    fn invalid_pattern_builds_nothing() {
        let shared = parent().into_shared();
        let err = build(&shared, "foo(", false).unwrap_err();
        assert!(matches!(err, SubsearchError::Pattern(_)));
    }

    #[test]
    fn build_reads_shared_parent() {
        let shared = parent().into_shared();
        let (_, child) = build(&shared, "Z", true).unwrap();
        assert_eq!(child.hits(), 1);
    }
}
