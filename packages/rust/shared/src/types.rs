//! Core domain types shared by the agenda reader, resolver, and assembler.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// FolderRef
// ---------------------------------------------------------------------------

/// A folder linked from the agenda document.
///
/// Identity is the opaque `id`; `name` is the link text and is only used
/// for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderRef {
    /// Backend container identifier.
    pub id: String,
    /// Link text as rendered in the agenda.
    pub name: String,
}

impl FolderRef {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// FileEntry
// ---------------------------------------------------------------------------

/// Whether a listed item is a document or a nested folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    Regular,
    Container,
}

/// An item listed inside a container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    /// Backend file identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Document or folder.
    pub kind: EntryKind,
    /// Content type reported by the backend.
    pub mime_type: String,
}

impl FileEntry {
    /// Build a regular (non-folder) entry.
    pub fn regular(
        id: impl Into<String>,
        name: impl Into<String>,
        mime_type: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind: EntryKind::Regular,
            mime_type: mime_type.into(),
        }
    }

    /// Build a container entry with the given folder mime type.
    pub fn container(
        id: impl Into<String>,
        name: impl Into<String>,
        mime_type: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind: EntryKind::Container,
            mime_type: mime_type.into(),
        }
    }

    pub fn is_container(&self) -> bool {
        self.kind == EntryKind::Container
    }
}

// ---------------------------------------------------------------------------
// MatchGroup / OutputManifest
// ---------------------------------------------------------------------------

/// Files selected from one linked folder, in backend listing order.
#[derive(Debug, Clone, Serialize)]
pub struct MatchGroup {
    /// The agenda link these files came from.
    pub source: FolderRef,
    /// Matching regular files. Never empty once placed in a manifest.
    pub files: Vec<FileEntry>,
}

/// Everything the assembler needs to populate the destination folder.
///
/// Group position in `groups` is the naming index used for copies.
#[derive(Debug, Clone, Serialize)]
pub struct OutputManifest {
    /// Parent container the destination is created under.
    pub parent_id: String,
    /// Destination folder name.
    pub folder_name: String,
    /// Non-empty groups in agenda order.
    pub groups: Vec<MatchGroup>,
}

impl OutputManifest {
    /// Total number of files across all groups.
    pub fn file_count(&self) -> usize {
        self.groups.iter().map(|g| g.files.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Ordering / naming policies
// ---------------------------------------------------------------------------

/// How sibling folder names are compared when picking the "latest" one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VersionOrder {
    /// Plain string comparison: `"v10" < "v9"`.
    #[default]
    Lexicographic,
    /// Digit runs compared by numeric value: `"v9" < "v10"`.
    Natural,
}

/// Prefix scheme for copied file names.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrefixStyle {
    /// `0. `, `1. `, `2. ` ...
    #[default]
    Numeric,
    /// `a. `, `b. `, ... `z. `, `aa. ` ...
    Alphabetic,
}

impl PrefixStyle {
    /// Render the prefix for a zero-based group index.
    pub fn label(self, index: usize) -> String {
        match self {
            Self::Numeric => index.to_string(),
            Self::Alphabetic => alphabetic_label(index),
        }
    }
}

/// Bijective base-26: 0 → a, 25 → z, 26 → aa.
fn alphabetic_label(index: usize) -> String {
    let mut n = index + 1;
    let mut out = Vec::new();
    while n > 0 {
        n -= 1;
        out.push(b'a' + (n % 26) as u8);
        n /= 26;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

impl fmt::Display for VersionOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lexicographic => f.write_str("lexicographic"),
            Self::Natural => f.write_str("natural"),
        }
    }
}
