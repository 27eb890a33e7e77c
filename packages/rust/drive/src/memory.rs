//! In-memory storage backend.
//!
//! Models a Drive-like tree: items may have several parents, listing order is
//! insertion order, and deleting a folder removes everything only reachable
//! through it. Every call is recorded so tests can assert on traversal.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use agendafetch_shared::{AgendaFetchError, FileEntry, Result};

use crate::{ChildFilter, FOLDER_MIME_TYPE, StorageBackend, kind_for_mime};

#[derive(Debug, Clone)]
struct Node {
    id: String,
    name: String,
    mime_type: String,
    parents: Vec<String>,
}

impl Node {
    fn entry(&self) -> FileEntry {
        FileEntry {
            id: self.id.clone(),
            name: self.name.clone(),
            kind: kind_for_mime(&self.mime_type),
            mime_type: self.mime_type.clone(),
        }
    }
}

/// One recorded backend call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    Export(String),
    List(String),
    Create { parent_id: String, name: String },
    Delete(String),
    Copy { source_id: String, new_name: String, parent_id: String },
}

#[derive(Debug, Default)]
struct Tree {
    nodes: Vec<Node>,
    documents: HashMap<String, String>,
    calls: Vec<BackendCall>,
    next_id: u64,
    /// Copies succeed this many times, then fail.
    copy_budget: Option<usize>,
}

impl Tree {
    fn fresh_id(&mut self) -> String {
        self.next_id += 1;
        format!("mem-{}", self.next_id)
    }

    fn find(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    fn insert(&mut self, id: String, parent: Option<&str>, name: &str, mime_type: &str) -> String {
        self.nodes.push(Node {
            id: id.clone(),
            name: name.to_string(),
            mime_type: mime_type.to_string(),
            parents: parent.map(|p| vec![p.to_string()]).unwrap_or_default(),
        });
        id
    }

    fn remove(&mut self, id: &str) {
        let mut removed: HashSet<String> = HashSet::from([id.to_string()]);
        self.nodes.retain(|n| n.id != id);

        // Cascade to items whose every parent is gone.
        loop {
            let orphans: Vec<String> = self
                .nodes
                .iter()
                .filter(|n| !n.parents.is_empty() && n.parents.iter().all(|p| removed.contains(p)))
                .map(|n| n.id.clone())
                .collect();
            if orphans.is_empty() {
                break;
            }
            self.nodes.retain(|n| !orphans.contains(&n.id));
            removed.extend(orphans);
        }

        for node in &mut self.nodes {
            node.parents.retain(|p| !removed.contains(p));
        }
    }
}

fn not_found(id: &str) -> AgendaFetchError {
    AgendaFetchError::Backend {
        status: 404,
        message: format!("File not found: {id}."),
    }
}

/// A Drive-shaped tree held in memory.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    tree: Mutex<Tree>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Tree> {
        // A poisoned lock only means a test panicked mid-call; the tree is still usable.
        self.tree.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Add a folder with a caller-chosen id.
    pub fn add_folder_with_id(&self, id: &str, parent: Option<&str>, name: &str) -> String {
        self.lock().insert(id.to_string(), parent, name, FOLDER_MIME_TYPE)
    }

    /// Add a folder and return its generated id.
    pub fn add_folder(&self, parent: Option<&str>, name: &str) -> String {
        let mut tree = self.lock();
        let id = tree.fresh_id();
        tree.insert(id, parent, name, FOLDER_MIME_TYPE)
    }

    /// Add a regular file and return its generated id.
    pub fn add_file(&self, parent: &str, name: &str, mime_type: &str) -> String {
        let mut tree = self.lock();
        let id = tree.fresh_id();
        tree.insert(id, Some(parent), name, mime_type)
    }

    /// Give an existing item an additional parent.
    pub fn link(&self, parent: &str, child: &str) {
        let mut tree = self.lock();
        if let Some(node) = tree.nodes.iter_mut().find(|n| n.id == child) {
            node.parents.push(parent.to_string());
        }
    }

    /// Register the HTML returned by [`StorageBackend::export`] for `document_id`.
    pub fn add_document(&self, document_id: &str, html: &str) {
        self.lock()
            .documents
            .insert(document_id.to_string(), html.to_string());
    }

    /// Let the next `n` copies succeed and fail every one after.
    pub fn fail_copies_after(&self, n: usize) {
        self.lock().copy_budget = Some(n);
    }

    /// Current children of `parent`, in listing order.
    pub fn children(&self, parent: &str) -> Vec<FileEntry> {
        self.lock()
            .nodes
            .iter()
            .filter(|n| n.parents.iter().any(|p| p == parent))
            .map(Node::entry)
            .collect()
    }

    /// Whether an item with this id exists.
    pub fn contains(&self, id: &str) -> bool {
        self.lock().find(id).is_some()
    }

    /// Every call made so far, in order.
    pub fn calls(&self) -> Vec<BackendCall> {
        self.lock().calls.clone()
    }

    /// Container ids passed to `list_children`, in order.
    pub fn listed(&self) -> Vec<String> {
        self.lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                BackendCall::List(id) => Some(id.clone()),
                _ => None,
            })
            .collect()
    }
}

impl StorageBackend for MemoryBackend {
    async fn export(&self, document_id: &str) -> Result<String> {
        let mut tree = self.lock();
        tree.calls.push(BackendCall::Export(document_id.to_string()));
        tree.documents
            .get(document_id)
            .cloned()
            .ok_or_else(|| not_found(document_id))
    }

    async fn list_children(&self, container_id: &str, filter: &ChildFilter) -> Result<Vec<FileEntry>> {
        let mut tree = self.lock();
        tree.calls.push(BackendCall::List(container_id.to_string()));
        Ok(tree
            .nodes
            .iter()
            .filter(|n| n.parents.iter().any(|p| p == container_id))
            .map(Node::entry)
            .filter(|e| filter.matches(e))
            .collect())
    }

    async fn create_container(&self, parent_id: &str, name: &str) -> Result<String> {
        let mut tree = self.lock();
        tree.calls.push(BackendCall::Create {
            parent_id: parent_id.to_string(),
            name: name.to_string(),
        });
        if tree.find(parent_id).is_none() {
            return Err(not_found(parent_id));
        }
        let id = tree.fresh_id();
        Ok(tree.insert(id, Some(parent_id), name, FOLDER_MIME_TYPE))
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let mut tree = self.lock();
        tree.calls.push(BackendCall::Delete(id.to_string()));
        if tree.find(id).is_none() {
            return Err(not_found(id));
        }
        tree.remove(id);
        Ok(())
    }

    async fn copy(&self, source_id: &str, new_name: &str, destination_parent_id: &str) -> Result<()> {
        let mut tree = self.lock();
        tree.calls.push(BackendCall::Copy {
            source_id: source_id.to_string(),
            new_name: new_name.to_string(),
            parent_id: destination_parent_id.to_string(),
        });

        if let Some(budget) = tree.copy_budget.as_mut() {
            if *budget == 0 {
                return Err(AgendaFetchError::Backend {
                    status: 500,
                    message: "Internal Error".into(),
                });
            }
            *budget -= 1;
        }

        let mime_type = match tree.find(source_id) {
            Some(node) if node.mime_type == FOLDER_MIME_TYPE => {
                return Err(AgendaFetchError::Backend {
                    status: 403,
                    message: "Folders cannot be copied.".into(),
                });
            }
            Some(node) => node.mime_type.clone(),
            None => return Err(not_found(source_id)),
        };
        if tree.find(destination_parent_id).is_none() {
            return Err(not_found(destination_parent_id));
        }

        let id = tree.fresh_id();
        tree.insert(id, Some(destination_parent_id), new_name, &mime_type);
        Ok(())
    }
}
