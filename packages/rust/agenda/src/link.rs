//! Folder-link recognition for exported agenda documents.
//!
//! Drive's HTML export rewrites every hyperlink into a redirect of the form
//! `https://www.google.com/url?q=<target>&sa=D&...`. A folder link's target is
//! `https://drive.google.com/<...>/folders/<ID>`, optionally followed by its
//! own `?usp=sharing` query.

use regex::Regex;
use std::sync::LazyLock;

/// Captures the folder id inside the `q=` redirect target.
///
/// The id runs up to the first `&` (end of the `q` parameter) or `?`
/// (start of the target's own query string).
static FOLDER_LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"q=https://drive\.google\.com/.*/folders/(.*?)[&?]").expect("folder link regex")
});

/// Extract a folder id from an exported link target, if it points at a folder.
pub fn folder_id_from_href(href: &str) -> Option<&str> {
    FOLDER_LINK_RE
        .captures(href)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .filter(|id| !id.is_empty())
}
