//! Filesystem primitives shared by the walker and the commit path.
//!
//! Everything here works on paths that may not exist yet, so normalization is
//! purely lexical and deletion of an absent path is a no-op.

use crate::core::error::CloisterError;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

/// Resolve `.` and `..` components without touching the filesystem.
///
/// `..` at the top of the path is clamped rather than kept, which is safe for
/// containment checks: a clamped path can never regain the prefix it escaped.
pub fn lexical_normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}

/// Delete a file or a whole directory tree. Absent paths are a no-op.
pub fn remove_path(path: &Path) -> Result<(), CloisterError> {
    match fs::symlink_metadata(path) {
        Ok(meta) => {
            if meta.is_dir() {
                fs::remove_dir_all(path)?;
            } else {
                fs::remove_file(path)?;
            }
            Ok(())
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err.into()),
    }
}

/// Copy a file, or a directory tree recursively, preserving permissions.
/// Existing destination files are replaced; a missing source is an error.
pub fn copy_recursive(src: &Path, dst: &Path) -> Result<(), CloisterError> {
    let meta = match fs::metadata(src) {
        Ok(meta) => meta,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            return Err(CloisterError::Storage(format!(
                "unable to copy '{}': no such file or directory",
                src.display()
            )));
        }
        Err(err) => return Err(err.into()),
    };

    if meta.is_file() {
        if let Some(parent) = dst.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(src, dst)?;
        return Ok(());
    }

    if meta.is_dir() {
        fs::create_dir_all(dst)?;
        for entry in fs::read_dir(src)? {
            let entry = entry?;
            copy_recursive(&entry.path(), &dst.join(entry.file_name()))?;
        }
        return Ok(());
    }

    Err(CloisterError::Storage(format!(
        "unable to copy '{}': unsupported file type",
        src.display()
    )))
}
