//! Request path validation for static file serving
//!
//! Maps an HTTP request target onto a file inside the public directory,
//! rejecting anything that could escape it.

use std::path::{Component, Path, PathBuf};

use crate::error::PathError;
use crate::{MAX_FILENAME_LEN, MAX_PATH_LEN};

/// File served for directory requests
pub const INDEX_FILE: &str = "index.html";

/// Resolve an HTTP request target (e.g. `/js/app.js?v=2`) under `base`.
///
/// The query string and fragment are ignored, a leading `/` is stripped,
/// and a target naming a directory (empty or ending in `/`) maps to
/// `index.html`. `..`, NUL bytes, and over-long names are rejected.
///
/// Symlinks are not followed here; call [`real_path_within`] once the file
/// is known to exist.
pub fn resolve_public_path(base: &Path, target: &str) -> Result<PathBuf, PathError> {
    let target = target
        .split(|c: char| c == '?' || c == '#')
        .next()
        .unwrap_or_default();

    if target.contains('\0') {
        return Err(PathError::Traversal("path contains null byte".into()));
    }

    if target.len() > MAX_PATH_LEN {
        return Err(PathError::Traversal(format!(
            "path too long: {} bytes (max {})",
            target.len(),
            MAX_PATH_LEN
        )));
    }

    if target.contains('\\') {
        return Err(PathError::Traversal("backslash not allowed".into()));
    }

    let relative = target.trim_start_matches('/');
    let mut result = base.to_path_buf();

    for component in Path::new(relative).components() {
        match component {
            Component::Normal(name) => {
                if name.len() > MAX_FILENAME_LEN {
                    return Err(PathError::Traversal(format!(
                        "filename too long: {} bytes (max {})",
                        name.len(),
                        MAX_FILENAME_LEN
                    )));
                }
                result.push(name);
            }
            Component::ParentDir => {
                return Err(PathError::Traversal(
                    "parent directory (..) not allowed".into(),
                ));
            }
            Component::CurDir => {}
            Component::Prefix(_) | Component::RootDir => {
                return Err(PathError::Traversal("absolute paths not allowed".into()));
            }
        }
    }

    if relative.is_empty() || relative.ends_with('/') {
        result.push(INDEX_FILE);
    }

    if !result.starts_with(base) {
        return Err(PathError::Traversal("path escapes public directory".into()));
    }

    Ok(result)
}

/// Canonicalize `path` and verify it still lies within `base` after
/// following symlinks.
pub fn real_path_within(base: &Path, path: &Path) -> Result<PathBuf, PathError> {
    let canonical_base = base
        .canonicalize()
        .map_err(|e| PathError::Resolve(format!("cannot canonicalize base: {}", e)))?;

    let canonical_path = path
        .canonicalize()
        .map_err(|e| PathError::Resolve(format!("cannot canonicalize path: {}", e)))?;

    if !canonical_path.starts_with(&canonical_base) {
        return Err(PathError::Traversal(
            "symlink escapes public directory".into(),
        ));
    }

    Ok(canonical_path)
}
