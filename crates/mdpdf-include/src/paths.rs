//! Path arithmetic for rebasing links of included documents.

use std::path::{Component, Path, PathBuf};

/// Lexically normalize a path: drop `.` and fold `..` into its parent.
pub(crate) fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Relative path leading from directory `base` to `target`.
///
/// Both paths must be absolute and normalized.
pub(crate) fn relative_path(base: &Path, target: &Path) -> PathBuf {
    let base: Vec<_> = base.components().collect();
    let target: Vec<_> = target.components().collect();

    let common = base
        .iter()
        .zip(&target)
        .take_while(|(a, b)| a == b)
        .count();

    let mut out = PathBuf::new();
    for _ in common..base.len() {
        out.push("..");
    }
    for component in &target[common..] {
        out.push(component.as_os_str());
    }
    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}

/// Whether a link target is a relative file reference that moves with its
/// document.
pub(crate) fn is_relative_link(url: &str) -> bool {
    !(url.is_empty()
        || url.starts_with('/')
        || url.starts_with('#')
        || url.contains("://")
        || url.starts_with("data:")
        || url.starts_with("mailto:"))
}

/// Rewrite `link`, relative to `from_dir`, so it resolves from `root_dir`.
pub(crate) fn rebase(link: &str, from_dir: &Path, root_dir: &Path) -> Option<String> {
    if from_dir == root_dir || !is_relative_link(link) {
        return None;
    }
    let target = normalize(&from_dir.join(link));
    Some(relative_path(root_dir, &target).to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_normalize() {
        assert_eq!(
            normalize(Path::new("/doc/sub/../img/./a.png")),
            PathBuf::from("/doc/img/a.png")
        );
    }

    #[test]
    fn test_relative_path_nested_to_root() {
        assert_eq!(
            relative_path(Path::new("/doc"), Path::new("/doc/chapters/img/a.png")),
            PathBuf::from("chapters/img/a.png")
        );
    }

    #[test]
    fn test_relative_path_sibling_tree() {
        assert_eq!(
            relative_path(Path::new("/doc/book"), Path::new("/doc/shared/a.png")),
            PathBuf::from("../shared/a.png")
        );
    }

    #[test]
    fn test_relative_path_same_dir() {
        assert_eq!(
            relative_path(Path::new("/doc"), Path::new("/doc")),
            PathBuf::from(".")
        );
    }

    #[test]
    fn test_rebase_skips_absolute_and_remote() {
        let from = Path::new("/doc/chapters");
        let root = Path::new("/doc");

        assert_eq!(rebase("img/a.png", from, root), Some("chapters/img/a.png".to_owned()));
        assert_eq!(rebase("../top.png", from, root), Some("top.png".to_owned()));
        assert_eq!(rebase("/abs/a.png", from, root), None);
        assert_eq!(rebase("https://x.org/a.png", from, root), None);
        assert_eq!(rebase("#anchor", from, root), None);
        assert_eq!(rebase("img/a.png", root, root), None);
    }
}
