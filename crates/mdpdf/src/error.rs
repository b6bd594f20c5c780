//! CLI error types.

use mdpdf_ast::AstError;
use mdpdf_config::ConfigError;
use mdpdf_filter::FilterError;

/// CLI error type.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Document(#[from] AstError),

    #[error("{0}")]
    Filter(#[from] FilterError),
}
