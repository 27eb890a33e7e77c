//! Storage backend abstraction and the Google Drive implementation.
//!
//! This crate provides:
//! - [`StorageBackend`]: the five operations the pipeline needs from a
//!   hierarchical file store
//! - [`DriveClient`]: Drive v3 REST implementation
//! - [`auth`]: access-token resolution from env or an authorized-user token file
//! - [`MemoryBackend`]: in-memory tree for tests and offline runs

pub mod auth;
mod client;
mod memory;
mod query;

use std::future::Future;

use agendafetch_shared::{EntryKind, FileEntry, Result};

pub use client::DriveClient;
pub use memory::{BackendCall, MemoryBackend};

/// Mime type Drive uses for folders.
pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

// ---------------------------------------------------------------------------
// ChildFilter
// ---------------------------------------------------------------------------

/// Narrows a child listing. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChildFilter {
    /// Exact name match.
    pub name: Option<String>,
    /// Only folders, or only non-folders.
    pub kind: Option<EntryKind>,
    /// Exact mime type match.
    pub mime_type: Option<String>,
}

impl ChildFilter {
    /// Match every child.
    pub fn any() -> Self {
        Self::default()
    }

    /// Match folders with exactly this name.
    pub fn container_named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            kind: Some(EntryKind::Container),
            mime_type: None,
        }
    }

    /// Whether `entry` passes this filter.
    pub fn matches(&self, entry: &FileEntry) -> bool {
        self.name.as_ref().is_none_or(|n| *n == entry.name)
            && self.kind.is_none_or(|k| k == entry.kind)
            && self.mime_type.as_ref().is_none_or(|m| *m == entry.mime_type)
    }
}

// ---------------------------------------------------------------------------
// StorageBackend
// ---------------------------------------------------------------------------

/// Capabilities the pipeline needs from a hierarchical file store.
///
/// Every call completes (or fails) before the pipeline issues the next one.
pub trait StorageBackend: Send + Sync {
    /// Render a document to HTML.
    fn export(&self, document_id: &str) -> impl Future<Output = Result<String>> + Send;

    /// List the immediate, non-trashed children of a container in backend order.
    fn list_children(
        &self,
        container_id: &str,
        filter: &ChildFilter,
    ) -> impl Future<Output = Result<Vec<FileEntry>>> + Send;

    /// Create an empty container and return its id.
    fn create_container(
        &self,
        parent_id: &str,
        name: &str,
    ) -> impl Future<Output = Result<String>> + Send;

    /// Permanently delete an item (and, for containers, everything inside it).
    fn delete(&self, id: &str) -> impl Future<Output = Result<()>> + Send;

    /// Copy a file into `destination_parent_id` under `new_name`.
    fn copy(
        &self,
        source_id: &str,
        new_name: &str,
        destination_parent_id: &str,
    ) -> impl Future<Output = Result<()>> + Send;
}

/// Classify a Drive mime type.
pub fn kind_for_mime(mime_type: &str) -> EntryKind {
    if mime_type == FOLDER_MIME_TYPE {
        EntryKind::Container
    } else {
        EntryKind::Regular
    }
}
