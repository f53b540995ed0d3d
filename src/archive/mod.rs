//! Archive module for persisting mirror content
//!
//! This module handles:
//! - Storing non-document responses observed during page loads
//! - Content-addressed naming of archived resources
//! - The on-disk layout of saved documents

mod document;
mod naming;

pub use document::{document_relative_path, save_document};
pub use naming::{
    extension_from_content_type, is_html_content_type, resource_relative_path, url_hash,
    RESOURCES_DIR,
};

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while writing mirror content
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Result type for archive operations
pub type ArchiveResult<T> = Result<T, ArchiveError>;

/// A resource stored in the mirror
///
/// Identity is the source URL; two URLs with identical bytes are stored twice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRecord {
    pub source_url: String,
    pub content_hash: String,
    pub local_path: String,
    pub content_type: Option<String>,
}

/// Writes resource responses under `<root>/resources/`, at most once per URL
#[derive(Debug)]
pub struct ResourceArchiver {
    root: PathBuf,
    seen: HashSet<String>,
    records: HashMap<String, ResourceRecord>,
}

impl ResourceArchiver {
    /// Creates an archiver rooted at the mirror output directory
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            seen: HashSet::new(),
            records: HashMap::new(),
        }
    }

    /// Archives one observed response
    ///
    /// # Returns
    ///
    /// * `Ok(Some(path))` - Newly written; the path is relative to the mirror root
    /// * `Ok(None)` - Already observed in this run, or an HTML document; no I/O performed
    /// * `Err(ArchiveError)` - The write failed; the URL is not attempted again
    pub fn archive(
        &mut self,
        url: &str,
        bytes: &[u8],
        content_type: Option<&str>,
    ) -> ArchiveResult<Option<String>> {
        if self.seen.contains(url) {
            tracing::trace!("Resource already archived: {}", url);
            return Ok(None);
        }

        if content_type.map_or(false, is_html_content_type) {
            return Ok(None);
        }

        self.seen.insert(url.to_string());

        let (content_hash, local_path) = resource_relative_path(url, content_type);
        let target = self.root.join(&local_path);
        write_file(&target, bytes)?;

        tracing::debug!("Archived {} -> {}", url, local_path);

        self.records.insert(
            url.to_string(),
            ResourceRecord {
                source_url: url.to_string(),
                content_hash,
                local_path: local_path.clone(),
                content_type: content_type.map(str::to_string),
            },
        );

        Ok(Some(local_path))
    }

    /// Path of a previously archived resource, without any I/O
    pub fn local_path(&self, url: &str) -> Option<&str> {
        self.records.get(url).map(|r| r.local_path.as_str())
    }

    pub fn record(&self, url: &str) -> Option<&ResourceRecord> {
        self.records.get(url)
    }
}

/// Writes bytes to `path`, creating parent directories as needed
pub(crate) fn write_file(path: &Path, bytes: &[u8]) -> ArchiveResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| ArchiveError::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    std::fs::write(path, bytes).map_err(|source| ArchiveError::Write {
        path: path.to_path_buf(),
        source,
    })
}
