//! Filter errors.

use mdpdf_diagrams::RenderError;
use mdpdf_include::IncludeError;

/// Error aborting a filter run.
///
/// Per-node failures only surface here in fail-fast mode; otherwise they
/// become error markers in the document.
#[derive(Debug, thiserror::Error)]
pub enum FilterError {
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    Include(#[from] IncludeError),
    #[error("interrupted")]
    Cancelled,
}

impl FilterError {
    fn is_cancelled(&self) -> bool {
        match self {
            Self::Render(e) => e.is_cancelled(),
            Self::Cancelled => true,
            Self::Include(e) => e.is_cancelled(),
        }
    }

    /// Collapse render and parse cancellation into [`FilterError::Cancelled`].
    pub(crate) fn normalize(self) -> Self {
        if self.is_cancelled() { Self::Cancelled } else { self }
    }
}
