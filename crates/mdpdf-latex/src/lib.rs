//! LaTeX fragments for mdpdf.
//!
//! Everything here returns LaTeX source for raw blocks or the preamble:
//!
//! - [`CodeFormatter`]: code blocks as `lstlisting` environments
//! - [`preamble`]: packages, colours, extra languages and `\lstset` defaults
//! - [`figure`], [`error_box`], [`vspace`]: diagram figures, failure markers
//!   and spacing
//!
//! All colours and lengths come from [`mdpdf_config::StyleConfig`].

mod escape;
mod figure;
mod language;
mod listing;
mod preamble;

pub use escape::escape_latex;
pub use figure::{Placement, error_box, figure, vspace};
pub use language::listings_language;
pub use listing::CodeFormatter;
pub use preamble::preamble;
