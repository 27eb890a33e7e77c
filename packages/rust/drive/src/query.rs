//! Drive `files.list` query construction.

use agendafetch_shared::EntryKind;

use crate::{ChildFilter, FOLDER_MIME_TYPE};

/// Quote a string literal for a Drive query (`\` and `'` are escaped).
pub(crate) fn quote(value: &str) -> String {
    let escaped = value.replace('\\', r"\\").replace('\'', r"\'");
    format!("'{escaped}'")
}

/// Build the `q` parameter listing the children of `parent_id`.
pub(crate) fn children_query(parent_id: &str, filter: &ChildFilter) -> String {
    let mut clauses = vec![
        format!("{} in parents", quote(parent_id)),
        "trashed = false".to_string(),
    ];

    if let Some(name) = &filter.name {
        clauses.push(format!("name = {}", quote(name)));
    }

    match filter.kind {
        Some(EntryKind::Container) => {
            clauses.push(format!("mimeType = {}", quote(FOLDER_MIME_TYPE)));
        }
        Some(EntryKind::Regular) if filter.mime_type.is_none() => {
            clauses.push(format!("mimeType != {}", quote(FOLDER_MIME_TYPE)));
        }
        _ => {}
    }

    if let Some(mime) = &filter.mime_type {
        clauses.push(format!("mimeType = {}", quote(mime)));
    }

    clauses.join(" and ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_listing() {
        assert_eq!(
            children_query("abc", &ChildFilter::any()),
            "'abc' in parents and trashed = false"
        );
    }

    #[test]
    fn named_folder_listing() {
        let q = children_query("parent", &ChildFilter::container_named("Rehearsal Pack"));
        assert_eq!(
            q,
            "'parent' in parents and trashed = false and name = 'Rehearsal Pack' \
             and mimeType = 'application/vnd.google-apps.folder'"
        );
    }

    #[test]
    fn quotes_are_escaped() {
        assert_eq!(quote("Director's Cut"), r"'Director\'s Cut'");
        assert_eq!(quote(r"a\b"), r"'a\\b'");
    }

    #[test]
    fn regular_kind_excludes_folders() {
        let filter = ChildFilter {
            kind: Some(EntryKind::Regular),
            ..ChildFilter::default()
        };
        assert!(children_query("p", &filter).ends_with("mimeType != 'application/vnd.google-apps.folder'"));
    }
}
