//! mdpdf - Pandoc JSON filter.
//!
//! Reads a Pandoc AST from stdin, expands `mdinclude` and
//! `codeblock-include` blocks, renders Mermaid and PlantUML diagrams and
//! typesets code listings, then writes the AST to stdout:
//!
//! ```text
//! pandoc doc.md --filter mdpdf -o doc.pdf
//! ```

mod error;
mod filter;
mod output;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use filter::FilterArgs;
use output::Output;

fn main() {
    let args = FilterArgs::parse();
    let output = Output::new();

    // --verbose enables INFO level, otherwise use RUST_LOG or default to WARN
    let filter = if args.verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::from_default_env()
    };
    // stdout carries the document
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = args.execute(&output) {
        output.error(&format!("Error: {err}"));
        std::process::exit(1);
    }
}
