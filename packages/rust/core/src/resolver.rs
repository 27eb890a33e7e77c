//! Linked-folder resolution.
//!
//! A linked folder either holds the target documents directly or holds a set
//! of version folders (`v1`, `v2`, `2024-03-01`, ...). In the second case we
//! follow the single "latest" child, picked by name, until a folder with target
//! documents or a dead end is reached. Sibling folders are never explored.

use std::cmp::Ordering;
use std::collections::HashSet;

use tracing::{debug, instrument};

use agendafetch_drive::{ChildFilter, StorageBackend};
use agendafetch_shared::{AgendaFetchError, EntryKind, FileEntry, Result, VersionOrder};

/// Resolves a linked folder to the target-type files it (eventually) contains.
pub struct FolderResolver<'a, B> {
    backend: &'a B,
    target_mime_type: String,
    order: VersionOrder,
    max_depth: u32,
}

impl<'a, B: StorageBackend> FolderResolver<'a, B> {
    /// `max_depth` bounds how many version folders may be entered below the link.
    pub fn new(
        backend: &'a B,
        target_mime_type: impl Into<String>,
        order: VersionOrder,
        max_depth: u32,
    ) -> Self {
        Self {
            backend,
            target_mime_type: target_mime_type.into(),
            order,
            max_depth,
        }
    }

    /// Return the target-type files reachable from `container_id`, in listing order.
    ///
    /// Fails with [`AgendaFetchError::CycleDetected`] if descent returns to a
    /// folder already on the path, and [`AgendaFetchError::DepthExceeded`] past
    /// `max_depth` levels.
    #[instrument(skip(self))]
    pub async fn resolve(&self, container_id: &str) -> Result<Vec<FileEntry>> {
        let mut current = container_id.to_string();
        let mut path: HashSet<String> = HashSet::new();
        let mut depth: u32 = 0;

        loop {
            if !path.insert(current.clone()) {
                return Err(AgendaFetchError::CycleDetected {
                    container_id: current,
                });
            }

            let children = self
                .backend
                .list_children(&current, &ChildFilter::any())
                .await?;

            let targets: Vec<FileEntry> = children
                .iter()
                .filter(|e| self.is_target(e))
                .cloned()
                .collect();

            if !targets.is_empty() {
                debug!(container = %current, depth, files = targets.len(), "found target files");
                return Ok(targets);
            }

            let Some(next) = latest_container(&children, self.order) else {
                debug!(container = %current, depth, "no target files and no subfolders");
                return Ok(Vec::new());
            };

            if depth >= self.max_depth {
                return Err(AgendaFetchError::DepthExceeded {
                    container_id: container_id.to_string(),
                    max_depth: self.max_depth,
                });
            }

            debug!(
                from = %current,
                into = %next.name,
                "descending into latest version folder"
            );
            depth += 1;
            current = next.id.clone();
        }
    }

    fn is_target(&self, entry: &FileEntry) -> bool {
        entry.kind == EntryKind::Regular && entry.mime_type == self.target_mime_type
    }
}

/// Pick the container with the greatest name; ties go to the first listed.
pub fn latest_container(entries: &[FileEntry], order: VersionOrder) -> Option<&FileEntry> {
    entries
        .iter()
        .filter(|e| e.is_container())
        .fold(None, |best: Option<&FileEntry>, e| match best {
            Some(b) if compare_names(order, &e.name, &b.name) != Ordering::Greater => Some(b),
            _ => Some(e),
        })
}

/// Compare two folder names under the given ordering.
pub fn compare_names(order: VersionOrder, a: &str, b: &str) -> Ordering {
    match order {
        VersionOrder::Lexicographic => a.cmp(b),
        VersionOrder::Natural => natural_cmp(a, b),
    }
}

/// Natural ordering: runs of ASCII digits compare by numeric value.
///
/// Names equal under that rule (`v01` vs `v1`) fall back to plain string order.
fn natural_cmp(a: &str, b: &str) -> Ordering {
    let (ac, bc) = (chunks(a), chunks(b));

    for (x, y) in ac.iter().zip(bc.iter()) {
        let ord = if is_digits(x) && is_digits(y) {
            cmp_digit_runs(x, y)
        } else {
            x.cmp(y)
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }

    ac.len().cmp(&bc.len()).then_with(|| a.cmp(b))
}

/// Split into alternating digit / non-digit runs.
fn chunks(s: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut prev: Option<bool> = None;

    for (i, c) in s.char_indices() {
        let digit = c.is_ascii_digit();
        if prev.is_some_and(|p| p != digit) {
            out.push(&s[start..i]);
            start = i;
        }
        prev = Some(digit);
    }
    if start < s.len() {
        out.push(&s[start..]);
    }
    out
}

fn is_digits(s: &str) -> bool {
    s.bytes().all(|b| b.is_ascii_digit())
}

fn cmp_digit_runs(x: &str, y: &str) -> Ordering {
    let x = x.trim_start_matches('0');
    let y = y.trim_start_matches('0');
    x.len().cmp(&y.len()).then_with(|| x.cmp(y))
}
