//! A resolved suite handle shared by the parser and the run-state store
//! (SPEC_FULL.md §3 supplement: factored out so both sides agree on the
//! same (name, directory) pair instead of re-deriving it from a path).

use std::path::{Path, PathBuf};

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Suite {
    name: String,
    dir: PathBuf,
}

impl Suite {
    #[must_use]
    pub fn new(name: impl Into<String>, dir: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            dir: dir.into(),
        }
    }

    /// Derive a suite handle from a directory path, using the final path
    /// component as the suite name.
    #[must_use]
    pub fn from_dir(dir: &Path) -> Self {
        let name = dir
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| dir.display().to_string());
        Self::new(name, dir.to_path_buf())
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}
