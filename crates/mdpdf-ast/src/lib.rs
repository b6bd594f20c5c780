//! Pandoc JSON document model for mdpdf.
//!
//! The filter only rewrites a handful of block kinds, so the model is a
//! closed set of [`Block`] variants for the nodes it inspects or descends
//! into, plus [`Block::Other`] which carries every other block as untouched
//! JSON. Inline content is kept as raw [`serde_json::Value`]s.
//!
//! # Example
//!
//! ```
//! use mdpdf_ast::{Block, Pandoc};
//!
//! let json = r#"{"pandoc-api-version":[1,23,1],"meta":{},"blocks":[
//!     {"t":"CodeBlock","c":[["",["mermaid"],[]],"graph TD"]},
//!     {"t":"HorizontalRule"}
//! ]}"#;
//! let doc = Pandoc::from_json(json).unwrap();
//!
//! assert!(matches!(&doc.blocks[0], Block::CodeBlock(attr, _) if attr.first_class() == Some("mermaid")));
//! assert!(matches!(&doc.blocks[1], Block::Other(_)));
//! ```

mod block;
mod document;
pub mod inline;
mod table;

pub use block::{Attr, Block, Format};
pub use table::{Caption, Cell, Row, TableBody, TableFoot, TableHead};
pub use document::{AstError, Pandoc};
pub use inline::Inline;
