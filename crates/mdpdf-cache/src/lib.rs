//! Artifact store abstraction for mdpdf.
//!
//! Rendered diagrams are files the typesetting backend reads after the filter
//! exits, so every store places artifacts on disk. Stores differ in whether
//! an existing artifact may be reused:
//!
//! - [`FileStore`]: persistent cache directory, reused across runs
//! - [`OutputStore`]: plain output directory, always misses on lookup
//!
//! Both lay files out as `{root}/{key}.{extension}`. The key is a
//! self-describing content digest, so no index file is kept, and stores
//! never delete entries.
//!
//! # Example
//!
//! ```no_run
//! use std::path::{Path, PathBuf};
//! use mdpdf_cache::{ArtifactStore, FileStore};
//!
//! let store = FileStore::new(PathBuf::from(".mdpdf/cache"));
//! if store.get("3f2a...", "png").is_none() {
//!     let path = store.put("3f2a...", "png", Path::new("/tmp/render/out.png")).unwrap();
//!     println!("stored at {}", path.display());
//! }
//! ```

mod file;
pub use file::{FileStore, OutputStore};

use std::io;
use std::path::{Path, PathBuf};

/// Storage for rendered artifacts keyed by content digest.
pub trait ArtifactStore: Send + Sync {
    /// Path of an existing artifact for `key`, if it may be reused.
    ///
    /// # Arguments
    ///
    /// * `key` - Content digest (hex)
    /// * `extension` - Artifact format extension (e.g., "png")
    fn get(&self, key: &str, extension: &str) -> Option<PathBuf>;

    /// Move or copy `source` into the store under `key`.
    ///
    /// Returns the final artifact path. The write is atomic: concurrent
    /// filter runs storing the same key never observe a partial file.
    fn put(&self, key: &str, extension: &str, source: &Path) -> io::Result<PathBuf>;

    /// Whether artifacts outlive this run as reusable cache entries.
    fn is_persistent(&self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_output_store_always_misses() {
        let tmp = TempDir::new().unwrap();
        let store = OutputStore::new(tmp.path().join("images"));
        let src = tmp.path().join("render.png");
        fs::write(&src, b"png").unwrap();

        let path = store.put("abc", "png", &src).unwrap();

        assert!(path.exists());
        assert_eq!(store.get("abc", "png"), None);
        assert!(!store.is_persistent());
    }

    #[test]
    fn test_stores_are_object_safe() {
        let tmp = TempDir::new().unwrap();
        let stores: Vec<Box<dyn ArtifactStore>> = vec![
            Box::new(FileStore::new(tmp.path().join("cache"))),
            Box::new(OutputStore::new(tmp.path().join("out"))),
        ];

        for store in &stores {
            assert_eq!(store.get("missing", "png"), None);
        }
    }
}
