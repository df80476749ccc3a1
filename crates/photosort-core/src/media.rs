use std::path::{Path, PathBuf};

use crate::classify::{self, Category};
use crate::hash;

/// One discovered source file, owned by the orchestrator for the
/// duration of its trip through the pipeline.
#[derive(Debug)]
pub struct MediaItem {
    path: PathBuf,
    category: Category,
    /// SHA-256 hex, computed at most once and reused for every decision.
    fingerprint: Option<String>,
}

impl MediaItem {
    pub fn new(path: PathBuf) -> Self {
        let category = classify::classify(&path);
        Self {
            path,
            category,
            fingerprint: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn category(&self) -> Category {
        self.category
    }

    /// File name as UTF-8, degrading lossily for exotic names.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "file".to_string())
    }

    /// Content fingerprint, computed on first use and cached.
    pub fn fingerprint(&mut self) -> anyhow::Result<&str> {
        let fp = match self.fingerprint.take() {
            Some(fp) => fp,
            None => hash::fingerprint(&self.path)?,
        };
        Ok(self.fingerprint.insert(fp).as_str())
    }
}
