//! Output path derivation and history key normalization.
//!
//! Both functions here are pure: no filesystem access, no directories created.

use std::ffi::OsString;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// Errors from output path derivation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PathError {
    /// The source file is not inside the input root.
    #[error("{source_path} is outside the input root {input_root}")]
    OutOfScope {
        source_path: PathBuf,
        input_root: PathBuf,
    },

    /// The source path has no file name component.
    #[error("{0} has no file name")]
    NoFileName(PathBuf),
}

/// Lexically normalize a path: drop `.` components and fold `..` into the
/// preceding component. Symlinks are not resolved.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let can_pop = matches!(
                    out.components().next_back(),
                    Some(Component::Normal(_))
                );
                if can_pop {
                    out.pop();
                } else if !out.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// History key for a source file: its normalized path as a string.
pub fn history_key(path: &Path) -> String {
    normalize(path).to_string_lossy().into_owned()
}

/// Derive the output path for `source` by mirroring its location under
/// `input_root` beneath `output_root` and inserting `suffix` between the
/// file stem and extension.
///
/// `/in/a/b/movie.mp4` with roots `/in` → `/out` and suffix `_t` maps to
/// `/out/a/b/movie_t.mp4`.
pub fn map_output_path(
    source: &Path,
    input_root: &Path,
    output_root: &Path,
    suffix: &str,
) -> Result<PathBuf, PathError> {
    let source_norm = normalize(source);
    let root_norm = normalize(input_root);

    let relative = source_norm
        .strip_prefix(&root_norm)
        .map_err(|_| PathError::OutOfScope {
            source_path: source.to_path_buf(),
            input_root: input_root.to_path_buf(),
        })?;

    let stem = relative
        .file_stem()
        .ok_or_else(|| PathError::NoFileName(source.to_path_buf()))?;

    let mut file_name = OsString::from(stem);
    file_name.push(suffix);
    if let Some(ext) = relative.extension() {
        file_name.push(".");
        file_name.push(ext);
    }

    let mut output = output_root.to_path_buf();
    if let Some(parent) = relative.parent() {
        output.push(parent);
    }
    output.push(file_name);
    Ok(output)
}
