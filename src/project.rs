// Project the REPL tool window belongs to

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    name: String,
    base_dir: PathBuf,
}

impl Project {
    pub fn new(name: impl Into<String>, base_dir: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            base_dir: base_dir.into(),
        }
    }

    /// Project rooted at `dir`, named after its last path component.
    pub fn from_dir(dir: impl Into<PathBuf>) -> Self {
        let base_dir = dir.into();
        let name = base_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "project".to_string());
        Self { name, base_dir }
    }

    /// Project for the current working directory.
    pub fn current() -> Result<Self> {
        let dir = std::env::current_dir().context("Could not determine current directory")?;
        Ok(Self::from_dir(dir))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }
}
