//! File system-related utilities.

use std::path::{Component, Path, PathBuf};

use crate::Error;

/// Returns the directory against which relative source paths are resolved.
pub fn current_root() -> Result<PathBuf, Error> {
    std::env::current_dir()
        .map_err(|e| Error::Io("while determining the working directory".to_string(), e))
}

/// Renders a path relative to `root` with forward slashes and without a
/// leading `./`, which is the form destination identifiers are derived from.
///
/// Paths outside of `root` are rendered as-is.
pub fn relative_slash_path(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    let rendered = rel
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy()),
            Component::ParentDir => Some("..".into()),
            Component::CurDir | Component::RootDir | Component::Prefix(_) => None,
        })
        .collect::<Vec<_>>()
        .join("/");
    if rel.has_root() {
        format!("/{}", rendered)
    } else {
        rendered
    }
}

/// Joins a slash-separated relative path onto `root`. Absolute paths are
/// returned unchanged.
pub fn absolutize<P: AsRef<Path>>(root: &Path, path: P) -> PathBuf {
    let path = path.as_ref();
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}
