//! Pandoc AST transformation for mdpdf.
//!
//! Takes a parsed Pandoc document and returns it with inclusion
//! directives expanded, diagrams replaced by rendered figures and, for
//! LaTeX output, code blocks typeset as `listings` environments.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use mdpdf_ast::Pandoc;
//! use mdpdf_config::Config;
//! use mdpdf_diagrams::CancelToken;
//! use mdpdf_filter::{Dispatcher, OutputFormat};
//!
//! let config = Config::load(None, None).unwrap();
//! let dispatcher = Dispatcher::from_config(
//!     &config,
//!     OutputFormat::parse("latex"),
//!     Path::new("."),
//!     None,
//!     CancelToken::new(),
//! );
//! let doc = Pandoc::read(std::io::stdin()).unwrap();
//! let (doc, stats) = dispatcher.transform(doc).unwrap();
//! doc.write(std::io::stdout()).unwrap();
//! eprintln!("{} diagrams", stats.diagrams);
//! ```

mod dispatcher;
mod error;
mod format;
mod path;

pub use dispatcher::{Dispatcher, ERROR_CLASS, FilterOptions, FilterStats};
pub use error::FilterError;
pub use format::OutputFormat;
