//! File-based artifact stores.
//!
//! Directory layout:
//! ```text
//! {root}/
//! +-- 0c7d...e1.png      # one artifact per key
//! +-- 9a41...07.svg
//! ```
//!
//! Writes go through a hidden temporary file in `{root}` followed by a
//! rename, so readers never see a half-written artifact even when the
//! source lives on another filesystem.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::ArtifactStore;

static STAGING_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// Persistent content-addressed cache rooted at a directory on disk.
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Create a store at `root`. The directory is created lazily on first write.
    #[must_use]
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }
}

impl ArtifactStore for FileStore {
    fn get(&self, key: &str, extension: &str) -> Option<PathBuf> {
        let path = artifact_path(&self.root, key, extension);
        match fs::metadata(&path) {
            Ok(meta) if meta.is_file() && meta.len() > 0 => {
                tracing::debug!(key, path = %path.display(), "artifact cache hit");
                Some(path)
            }
            _ => None,
        }
    }

    fn put(&self, key: &str, extension: &str, source: &Path) -> io::Result<PathBuf> {
        place(&self.root, key, extension, source)
    }

    fn is_persistent(&self) -> bool {
        true
    }
}

/// Output directory for artifacts that are never reused across runs.
///
/// Every lookup misses, so each run renders afresh; artifacts are still
/// written to disk for the typesetting backend to pick up.
pub struct OutputStore {
    root: PathBuf,
}

impl OutputStore {
    #[must_use]
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }
}

impl ArtifactStore for OutputStore {
    fn get(&self, _key: &str, _extension: &str) -> Option<PathBuf> {
        None
    }

    fn put(&self, key: &str, extension: &str, source: &Path) -> io::Result<PathBuf> {
        place(&self.root, key, extension, source)
    }

    fn is_persistent(&self) -> bool {
        false
    }
}

fn artifact_path(root: &Path, key: &str, extension: &str) -> PathBuf {
    root.join(format!("{key}.{extension}"))
}

/// Copy `source` into `root` under the artifact name, atomically.
fn place(root: &Path, key: &str, extension: &str, source: &Path) -> io::Result<PathBuf> {
    fs::create_dir_all(root)?;
    let target = artifact_path(root, key, extension);
    let staging = root.join(format!(
        ".{key}.{extension}.{}-{}.tmp",
        std::process::id(),
        STAGING_COUNTER.fetch_add(1, Ordering::Relaxed)
    ));

    fs::copy(source, &staging)?;
    if let Err(e) = fs::rename(&staging, &target) {
        let _ = fs::remove_file(&staging);
        return Err(e);
    }

    tracing::debug!(key, path = %target.display(), "stored artifact");
    Ok(target)
}
