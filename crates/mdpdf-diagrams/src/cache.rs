//! Diagram cache key computation.
//!
//! Provides [`CacheKey`] for computing content-based digests that name
//! rendered artifacts.

use sha2::{Digest, Sha256};

/// Diagram parameters for cache key computation.
///
/// Contains everything that affects the rendered bytes.
#[derive(Debug, Clone, Copy)]
pub struct CacheKey<'a> {
    /// Diagram kind name (e.g., "mermaid").
    pub kind: &'a str,
    /// Artifact format extension (e.g., "png").
    pub format: &'a str,
    /// Renderer identity: crate version plus the command template.
    pub renderer_version: &'a str,
    /// Diagram source after preprocessing.
    pub source: &'a str,
}

impl CacheKey<'_> {
    /// Compute the hex digest for this key.
    ///
    /// # Hash Format
    ///
    /// SHA-256 of the four fields joined with NUL bytes, in declaration order.
    #[must_use]
    pub fn compute_hash(&self) -> String {
        let mut hasher = Sha256::new();
        for (i, field) in [self.kind, self.format, self.renderer_version, self.source]
            .iter()
            .enumerate()
        {
            if i > 0 {
                hasher.update([0u8]);
            }
            hasher.update(field.as_bytes());
        }
        hex::encode(hasher.finalize())
    }
}
