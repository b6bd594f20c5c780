//! Render errors.

use std::time::Duration;

use crate::language::DiagramKind;

/// Single diagram rendering error.
///
/// Cloneable so a failed render can be shared by every request that waited
/// on the same cache key.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{kind} diagram: {reason}")]
pub struct RenderError {
    pub kind: DiagramKind,
    pub reason: RenderErrorKind,
}

/// Kind of rendering error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RenderErrorKind {
    #[error("renderer exited with {status}: {stderr}")]
    NonZeroExit { status: String, stderr: String },
    #[error("renderer timed out after {}s: {stderr}", .after.as_secs_f64())]
    Timeout { after: Duration, stderr: String },
    #[error("failed to start renderer '{program}': {message}")]
    Spawn { program: String, message: String },
    #[error("renderer did not produce {expected}: {stderr}")]
    MissingOutput { expected: String, stderr: String },
    #[error("rendering cancelled")]
    Cancelled,
    #[error("I/O error: {0}")]
    Io(String),
}

impl RenderError {
    pub(crate) fn new(kind: DiagramKind, reason: RenderErrorKind) -> Self {
        Self { kind, reason }
    }

    /// Whether the run was interrupted rather than the diagram failing.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self.reason, RenderErrorKind::Cancelled)
    }
}
