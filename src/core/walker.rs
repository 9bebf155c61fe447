//! Containment-enforcing navigation of a directory subtree.
//!
//! A [`Walker`] is rooted at a fixed absolute path and only ever hands out
//! paths below that root. Every resolution normalizes the candidate and checks
//! the root prefix, which is the sole defense against traversal through
//! adversarial names such as `"../x"`.

use crate::core::error::CloisterError;
use crate::core::fsutil;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct Walker {
    root: PathBuf,
}

impl Walker {
    /// Root a walker at `root`, creating the directory if absent. Fails if the
    /// path exists as a regular file.
    pub fn new(root: impl Into<PathBuf>) -> Result<Walker, CloisterError> {
        let root = fsutil::lexical_normalize(&std::path::absolute(root.into())?);

        if root.exists() && !root.is_dir() {
            return Err(CloisterError::Storage(format!(
                "directory was expected (path: {})",
                root.display()
            )));
        }

        fs::create_dir_all(&root)?;
        Ok(Walker { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Return a walker re-rooted one level deeper, creating the subdirectory.
    pub fn walk(&self, into: &str) -> Result<Walker, CloisterError> {
        Walker::new(self.directory(into)?)
    }

    /// Resolve a directory path by name. Non-existent targets are valid;
    /// hitting an existing regular file is an error.
    pub fn directory(&self, name: &str) -> Result<PathBuf, CloisterError> {
        let walked = self.resolve(name)?;

        if walked.is_dir() || !walked.exists() {
            return Ok(walked);
        }

        Err(CloisterError::Storage(format!(
            "directory was expected, got a file instead (path: {})",
            walked.display()
        )))
    }

    /// Resolve a file path by name. Non-existent targets are valid since they
    /// will be created on first write; hitting a directory is an error.
    pub fn file(&self, filename: &str) -> Result<PathBuf, CloisterError> {
        let walked = self.resolve(filename)?;

        if walked.is_file() || !walked.exists() {
            return Ok(walked);
        }

        Err(CloisterError::Storage(format!(
            "file was expected, got a directory instead (path: {})",
            walked.display()
        )))
    }

    fn resolve(&self, name: &str) -> Result<PathBuf, CloisterError> {
        let walked = fsutil::lexical_normalize(&std::path::absolute(self.root.join(name))?);

        if !walked.starts_with(&self.root) {
            return Err(CloisterError::OutOfBounds {
                root: self.root.clone(),
                resolved: walked,
            });
        }

        Ok(walked)
    }
}
