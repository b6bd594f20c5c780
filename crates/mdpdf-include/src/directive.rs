//! Inclusion directive grammar.
//!
//! The body of an `mdinclude` or `codeblock-include` block is read line by
//! line:
//!
//! ```text
//! # comment
//! Increase_headers=True
//! ./chapters/intro.md
//! ```
//!
//! - lines starting with `#` are comments
//! - `Increase_headers=True|False` sets a flag for every following path in
//!   the same block
//! - any other non-blank line is a path relative to the including document
//!
//! Surrounding whitespace is ignored on every line.

use std::path::PathBuf;

const INCREASE_HEADERS: &str = "Increase_headers";

/// One parsed directive line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    /// Splice a markdown document.
    IncludeDocument { path: PathBuf, increase_headers: bool },
    /// Append a file's bytes to a code block.
    IncludeCodeFile { path: PathBuf },
    Comment(String),
}

/// Malformed directive line.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("line {line}: malformed directive '{content}' (expected {INCREASE_HEADERS}=True or {INCREASE_HEADERS}=False)")]
pub struct DirectiveParseError {
    /// One-based line number within the block.
    pub line: usize,
    pub content: String,
}

/// Which kind of block the directives come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectiveMode {
    /// `mdinclude`: paths are documents.
    Document,
    /// `codeblock-include`: paths are code files; the header flag has no effect.
    Code,
}

/// Parse a directive block into directives, in source line order.
///
/// # Errors
///
/// Returns [`DirectiveParseError`] for an `Increase_headers` line whose value
/// is missing or not exactly `True`/`False`.
pub fn parse_directives(
    text: &str,
    mode: DirectiveMode,
) -> Result<Vec<Directive>, DirectiveParseError> {
    let mut increase_headers = false;
    let mut directives = Vec::new();

    for (index, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        if let Some(comment) = line.strip_prefix('#') {
            directives.push(Directive::Comment(comment.trim().to_owned()));
            continue;
        }
        if is_flag_line(line) {
            increase_headers = parse_flag(line).ok_or_else(|| DirectiveParseError {
                line: index + 1,
                content: line.to_owned(),
            })?;
            continue;
        }

        let path = PathBuf::from(line);
        directives.push(match mode {
            DirectiveMode::Document => Directive::IncludeDocument {
                path,
                increase_headers,
            },
            DirectiveMode::Code => Directive::IncludeCodeFile { path },
        });
    }

    Ok(directives)
}

/// Whether a trimmed line sets the header flag rather than naming a path.
///
/// `Increase_headers_appendix.md` is a path; `Increase_headers` alone and
/// `Increase_headers = x` are flag lines.
pub(crate) fn is_flag_line(line: &str) -> bool {
    line == INCREASE_HEADERS
        || line
            .split_once('=')
            .is_some_and(|(name, _)| name.trim() == INCREASE_HEADERS)
}

fn parse_flag(line: &str) -> Option<bool> {
    let (_, value) = line.split_once('=')?;
    match value.trim() {
        "True" => Some(true),
        "False" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn document(path: &str, increase_headers: bool) -> Directive {
        Directive::IncludeDocument {
            path: PathBuf::from(path),
            increase_headers,
        }
    }

    #[test]
    fn test_parse_document_directives() {
        let text = "# chapter list\nIncrease_headers=True\n./a.md\n\n  b.md  \n";

        let directives = parse_directives(text, DirectiveMode::Document).unwrap();

        assert_eq!(
            directives,
            vec![
                Directive::Comment("chapter list".to_owned()),
                document("./a.md", true),
                document("b.md", true),
            ]
        );
    }

    #[test]
    fn test_flag_applies_to_following_lines_only() {
        let text = "first.md\nIncrease_headers=True\nsecond.md\nIncrease_headers=False\nthird.md";

        let directives = parse_directives(text, DirectiveMode::Document).unwrap();

        assert_eq!(
            directives,
            vec![
                document("first.md", false),
                document("second.md", true),
                document("third.md", false),
            ]
        );
    }

    #[test]
    fn test_flag_tolerates_spaces_around_equals() {
        let directives =
            parse_directives("Increase_headers = True\na.md", DirectiveMode::Document).unwrap();

        assert_eq!(directives, vec![document("a.md", true)]);
    }

    #[test]
    fn test_malformed_flag_value() {
        let err = parse_directives("a.md\nIncrease_headers=maybe", DirectiveMode::Document)
            .unwrap_err();

        assert_eq!(
            err,
            DirectiveParseError {
                line: 2,
                content: "Increase_headers=maybe".to_owned()
            }
        );
    }

    #[test]
    fn test_flag_without_value() {
        let err = parse_directives("Increase_headers", DirectiveMode::Document).unwrap_err();
        assert_eq!(err.line, 1);
    }

    #[test]
    fn test_flag_is_case_sensitive() {
        assert!(parse_directives("Increase_headers=true", DirectiveMode::Document).is_err());
    }

    #[test]
    fn test_path_starting_with_flag_name() {
        let text = "Increase_headers=True\nIncrease_headers_appendix.md\n./Increase_headers.md";

        let directives = parse_directives(text, DirectiveMode::Document).unwrap();

        assert_eq!(
            directives,
            vec![
                document("Increase_headers_appendix.md", true),
                document("./Increase_headers.md", true),
            ]
        );
    }

    #[test]
    fn test_code_mode() {
        let directives = parse_directives("# sources\n./x.py\n./y.py", DirectiveMode::Code).unwrap();

        assert_eq!(
            directives,
            vec![
                Directive::Comment("sources".to_owned()),
                Directive::IncludeCodeFile {
                    path: PathBuf::from("./x.py")
                },
                Directive::IncludeCodeFile {
                    path: PathBuf::from("./y.py")
                },
            ]
        );
    }
}
