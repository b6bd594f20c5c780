//! Inclusion resolution.
//!
//! Document inclusion is resolved depth-first off-tree: each included file
//! is parsed, its relative links are rebased onto the root document's
//! directory, its own `mdinclude` blocks are expanded, and only then are its
//! headers promoted. Promotion therefore compounds across nesting levels.
//!
//! An explicit stack of canonical paths guards against cycles; its length
//! bounds the nesting depth.

use std::fs;
use std::io;
use std::mem;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use mdpdf_ast::{Block, inline};

use crate::directive::{self, Directive, DirectiveMode, parse_directives};
use crate::error::{IncludeError, InclusionError, InclusionErrorKind};
use crate::parser::{DocumentParser, ParseError};
use crate::paths;

/// Fence tag of document inclusion blocks.
pub const MDINCLUDE: &str = "mdinclude";

/// Fence tag of code-file inclusion blocks.
pub const CODEBLOCK_INCLUDE: &str = "codeblock-include";

/// Default limit on nested document inclusion.
pub const DEFAULT_MAX_DEPTH: usize = 16;

/// Blocks produced by a document inclusion.
#[derive(Debug)]
pub struct Inclusion {
    pub blocks: Vec<Block>,
    /// Number of files read, nested ones included.
    pub documents: usize,
}

/// Content produced by a code-file inclusion.
#[derive(Debug, PartialEq, Eq)]
pub struct IncludedCode {
    /// File contents joined with single newlines.
    pub text: String,
    /// Language tag inferred from the first file's extension.
    pub language: Option<String>,
    pub files: Vec<PathBuf>,
}

/// Resolves inclusion directive blocks.
pub struct Resolver {
    parser: Arc<dyn DocumentParser>,
    root_dir: PathBuf,
    root_document: Option<PathBuf>,
    max_depth: usize,
}

impl Resolver {
    /// Resolver for a root document living in `root_dir`.
    #[must_use]
    pub fn new(parser: Arc<dyn DocumentParser>, root_dir: &Path) -> Self {
        Self {
            parser,
            root_dir: canonical_or_normalized(root_dir),
            root_document: None,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Register the root document so including it again is a cycle.
    #[must_use]
    pub fn with_root_document(mut self, path: &Path) -> Self {
        self.root_document = Some(canonical_or_normalized(path));
        self
    }

    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    #[must_use]
    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    /// Expand an `mdinclude` block written in a document in `including_dir`.
    ///
    /// # Errors
    ///
    /// Returns [`IncludeError`] for malformed directives and for any file
    /// that is missing, unreadable, unparsable, cyclic or nested too deep.
    pub fn resolve_document_inclusion(
        &self,
        directives: &str,
        including_dir: &Path,
    ) -> Result<Inclusion, IncludeError> {
        let mut state = State {
            stack: self.root_document.iter().cloned().collect(),
            documents: 0,
        };
        let including_dir = canonical_or_normalized(including_dir);
        let source = self
            .root_document
            .clone()
            .unwrap_or_else(|| including_dir.clone());

        let blocks = self.expand_directives(directives, &including_dir, &source, &mut state)?;

        Ok(Inclusion {
            blocks,
            documents: state.documents,
        })
    }

    /// Read the files listed in a `codeblock-include` block.
    ///
    /// # Errors
    ///
    /// Returns [`IncludeError`] for malformed directives and for missing or
    /// unreadable files.
    pub fn resolve_code_inclusion(
        &self,
        directives: &str,
        including_dir: &Path,
    ) -> Result<IncludedCode, IncludeError> {
        let parsed = parse_directives(directives, DirectiveMode::Code).map_err(|source| {
            IncludeError::Directive {
                path: including_dir.to_path_buf(),
                source,
            }
        })?;

        let mut parts = Vec::new();
        let mut files = Vec::new();
        for directive in parsed {
            let Directive::IncludeCodeFile { path } = directive else {
                continue;
            };
            let path = paths::normalize(&including_dir.join(path));
            let bytes = fs::read(&path).map_err(|e| read_error(&path, &e))?;
            parts.push(String::from_utf8_lossy(&bytes).into_owned());
            files.push(path);
        }

        if files.is_empty() {
            tracing::warn!(dir = %including_dir.display(), "codeblock-include lists no files");
        }

        Ok(IncludedCode {
            text: parts.join("\n"),
            language: files.first().and_then(|p| infer_language(p)).map(str::to_owned),
            files,
        })
    }

    fn expand_directives(
        &self,
        directives: &str,
        including_dir: &Path,
        source: &Path,
        state: &mut State,
    ) -> Result<Vec<Block>, IncludeError> {
        let parsed = parse_directives(directives, DirectiveMode::Document).map_err(|e| {
            IncludeError::Directive {
                path: source.to_path_buf(),
                source: e,
            }
        })?;

        let mut blocks = Vec::new();
        for directive in parsed {
            if let Directive::IncludeDocument {
                path,
                increase_headers,
            } = directive
            {
                let path = including_dir.join(path);
                blocks.extend(self.include_document(&path, increase_headers, state)?);
            }
        }
        Ok(blocks)
    }

    fn include_document(
        &self,
        path: &Path,
        increase_headers: bool,
        state: &mut State,
    ) -> Result<Vec<Block>, IncludeError> {
        let canonical = fs::canonicalize(path).map_err(|e| read_error(path, &e))?;

        if state.stack.contains(&canonical) {
            let mut chain = state.stack.clone();
            chain.push(canonical.clone());
            return Err(InclusionError::new(&canonical, InclusionErrorKind::Cycle { chain }).into());
        }
        let depth = state.stack.len() - usize::from(self.root_document.is_some()) + 1;
        if depth > self.max_depth {
            return Err(InclusionError::new(
                &canonical,
                InclusionErrorKind::DepthExceeded {
                    limit: self.max_depth,
                },
            )
            .into());
        }

        let bytes = fs::read(&canonical).map_err(|e| read_error(&canonical, &e))?;
        let markdown = String::from_utf8_lossy(&bytes);
        let mut blocks = self.parser.parse(&markdown, &canonical).map_err(|e| {
            let kind = match e {
                ParseError::Cancelled => InclusionErrorKind::Cancelled,
                e => InclusionErrorKind::Parse(e.to_string()),
            };
            InclusionError::new(&canonical, kind)
        })?;

        let dir = canonical.parent().unwrap_or(Path::new("/")).to_path_buf();
        self.rebase_links(&mut blocks, &dir);

        state.stack.push(canonical.clone());
        let expanded = self.expand_blocks(blocks, &dir, &canonical, state);
        state.stack.pop();
        let mut expanded = expanded?;

        if increase_headers {
            for block in &mut expanded {
                block.visit_mut(&mut promote_header);
            }
        }

        state.documents += 1;
        tracing::debug!(
            path = %canonical.display(),
            depth,
            increase_headers,
            blocks = expanded.len(),
            "included document"
        );
        Ok(expanded)
    }

    /// Replace nested `mdinclude` blocks, at any container depth.
    fn expand_blocks(
        &self,
        blocks: Vec<Block>,
        dir: &Path,
        source: &Path,
        state: &mut State,
    ) -> Result<Vec<Block>, IncludeError> {
        let mut out = Vec::with_capacity(blocks.len());
        for mut block in blocks {
            if let Block::CodeBlock(attr, text) = &block
                && attr.first_class() == Some(MDINCLUDE)
            {
                out.extend(self.expand_directives(text, dir, source, state)?);
                continue;
            }
            for children in block.children_mut() {
                let taken = mem::take(children);
                *children = self.expand_blocks(taken, dir, source, state)?;
            }
            out.push(block);
        }
        Ok(out)
    }

    /// Make relative image targets and `codeblock-include` paths of a
    /// document in `dir` resolve from the root directory.
    fn rebase_links(&self, blocks: &mut [Block], dir: &Path) {
        if dir == self.root_dir {
            return;
        }
        let mut rebase = |url: &str| paths::rebase(url, dir, &self.root_dir);

        for block in blocks.iter_mut() {
            block.visit_json_mut(&mut |value| inline::rewrite_image_urls(value, &mut rebase));
            block.visit_mut(&mut |b| {
                if let Block::CodeBlock(attr, text) = b
                    && attr.first_class() == Some(CODEBLOCK_INCLUDE)
                {
                    *text = rebase_code_directives(text, dir, &self.root_dir);
                }
            });
        }
    }
}

struct State {
    stack: Vec<PathBuf>,
    documents: usize,
}

fn rebase_code_directives(text: &str, dir: &Path, root_dir: &Path) -> String {
    text.lines()
        .map(|line| {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') || directive::is_flag_line(trimmed) {
                return line.to_owned();
            }
            paths::rebase(trimmed, dir, root_dir).unwrap_or_else(|| line.to_owned())
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Promote a header by one level, clamped at 6.
fn promote_header(block: &mut Block) {
    if let Block::Header(level, _, _) = block {
        *level = level.saturating_add(1).min(6);
    }
}

fn read_error(path: &Path, e: &io::Error) -> IncludeError {
    let kind = if e.kind() == io::ErrorKind::NotFound {
        InclusionErrorKind::Missing
    } else {
        InclusionErrorKind::Unreadable(e.to_string())
    };
    InclusionError::new(path, kind).into()
}

fn canonical_or_normalized(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| paths::normalize(path))
}

/// Fence language tag for a source file extension.
#[must_use]
pub fn infer_language(path: &Path) -> Option<&'static str> {
    let extension = path.extension()?.to_str()?.to_ascii_lowercase();
    let language = match extension.as_str() {
        "py" => "python",
        "java" => "java",
        "c" | "h" => "c",
        "cpp" | "cc" | "cxx" | "hpp" | "hh" => "cpp",
        "js" | "mjs" | "cjs" => "javascript",
        "sh" | "bash" => "bash",
        "html" | "htm" => "html",
        "xml" => "xml",
        "sql" => "sql",
        "json" => "json",
        "yaml" | "yml" => "yaml",
        "go" => "go",
        "rb" => "ruby",
        "pl" | "pm" => "perl",
        "rs" => "rust",
        "txt" => "text",
        _ => return None,
    };
    Some(language)
}
