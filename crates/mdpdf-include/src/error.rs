//! Inclusion errors.

use std::path::{Path, PathBuf};

use crate::directive::DirectiveParseError;

/// Failure to include a file.
#[derive(Debug, thiserror::Error)]
#[error("cannot include {}: {kind}", path.display())]
pub struct InclusionError {
    pub path: PathBuf,
    pub kind: InclusionErrorKind,
}

/// Kind of inclusion failure.
#[derive(Debug, thiserror::Error)]
pub enum InclusionErrorKind {
    #[error("file not found")]
    Missing,
    #[error("unreadable: {0}")]
    Unreadable(String),
    #[error("parse failed: {0}")]
    Parse(String),
    #[error("inclusion cycle {}", format_chain(.chain))]
    Cycle { chain: Vec<PathBuf> },
    #[error("nesting deeper than {limit} levels")]
    DepthExceeded { limit: usize },
    #[error("parsing interrupted")]
    Cancelled,
}

impl InclusionError {
    pub(crate) fn new(path: &Path, kind: InclusionErrorKind) -> Self {
        Self {
            path: path.to_path_buf(),
            kind,
        }
    }
}

/// Error resolving a directive block.
#[derive(Debug, thiserror::Error)]
pub enum IncludeError {
    /// A directive line in the block at `path` is malformed.
    #[error("{}: {source}", path.display())]
    Directive {
        path: PathBuf,
        source: DirectiveParseError,
    },
    #[error(transparent)]
    Inclusion(#[from] InclusionError),
}

impl IncludeError {
    /// Whether the run was interrupted while parsing an included document.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            Self::Inclusion(InclusionError {
                kind: InclusionErrorKind::Cancelled,
                ..
            })
        )
    }
}

fn format_chain(chain: &[PathBuf]) -> String {
    chain
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_message_lists_chain() {
        let err = InclusionError::new(
            Path::new("/doc/a.md"),
            InclusionErrorKind::Cycle {
                chain: vec![
                    PathBuf::from("/doc/a.md"),
                    PathBuf::from("/doc/b.md"),
                    PathBuf::from("/doc/a.md"),
                ],
            },
        );

        assert_eq!(
            err.to_string(),
            "cannot include /doc/a.md: inclusion cycle /doc/a.md -> /doc/b.md -> /doc/a.md"
        );
    }

    #[test]
    fn test_directive_error_names_block_location() {
        let err = IncludeError::Directive {
            path: PathBuf::from("/doc/main.md"),
            source: DirectiveParseError {
                line: 3,
                content: "Increase_headers=yes".to_owned(),
            },
        };

        assert!(err.to_string().starts_with("/doc/main.md: line 3"));
    }
}
