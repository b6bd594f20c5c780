//! Document and code-file inclusion for mdpdf.
//!
//! Two fenced block kinds pull external files into a document:
//!
//! - `mdinclude`: each listed markdown file is parsed and its blocks are
//!   spliced in place of the directive block, optionally with headers
//!   promoted by one level (`Increase_headers=True`)
//! - `codeblock-include`: the listed files are concatenated into the code
//!   block's content
//!
//! Paths are relative to the directory of the including document. Nested
//! inclusion is resolved recursively with cycle detection and a depth
//! limit. See [`directive`] for the block grammar.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use mdpdf_include::{CmarkParser, Resolver};
//!
//! let resolver = Resolver::new(Arc::new(CmarkParser), Path::new("docs"));
//! let inclusion = resolver
//!     .resolve_document_inclusion("Increase_headers=True\n./intro.md", Path::new("docs"))
//!     .unwrap();
//! println!("{} blocks", inclusion.blocks.len());
//! ```

mod cmark;
pub mod directive;
mod error;
mod parser;
mod paths;
mod resolver;

pub use cmark::CmarkParser;
pub use directive::{Directive, DirectiveMode, DirectiveParseError, parse_directives};
pub use error::{IncludeError, InclusionError, InclusionErrorKind};
pub use parser::{DocumentParser, PandocParser, ParseError};
pub use resolver::{
    CODEBLOCK_INCLUDE, DEFAULT_MAX_DEPTH, IncludedCode, Inclusion, MDINCLUDE, Resolver,
    infer_language,
};
