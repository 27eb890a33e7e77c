//! Keyword filtering of candidate file names.

use agendafetch_shared::FileEntry;
use caseless::default_case_fold_str;

/// Selects files whose names contain any keyword, ignoring case.
///
/// Matching is plain substring matching on Unicode case-folded text, so
/// `"min"` matches `"March Minutes.pdf"` and `"strasse"` matches `"Straße"`.
#[derive(Debug, Clone)]
pub struct KeywordFilter {
    keywords: Vec<String>,
}

impl KeywordFilter {
    /// Build a filter. Empty keywords are dropped, since they would match everything.
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let keywords = keywords
            .into_iter()
            .map(|k| default_case_fold_str(k.as_ref()))
            .filter(|k| !k.is_empty())
            .collect();
        Self { keywords }
    }

    /// The first keyword found in `name`, if any.
    pub fn matching_keyword(&self, name: &str) -> Option<&str> {
        let name = default_case_fold_str(name);
        self.keywords
            .iter()
            .find(|k| name.contains(k.as_str()))
            .map(String::as_str)
    }

    pub fn matches(&self, name: &str) -> bool {
        self.matching_keyword(name).is_some()
    }

    /// Keep matching regular files, preserving their order.
    pub fn apply(&self, entries: Vec<FileEntry>) -> Vec<FileEntry> {
        entries
            .into_iter()
            .filter(|e| !e.is_container() && self.matches(&e.name))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PDF: &str = "application/pdf";

    fn files(names: &[&str]) -> Vec<FileEntry> {
        names
            .iter()
            .enumerate()
            .map(|(i, n)| FileEntry::regular(i.to_string(), *n, PDF))
            .collect()
    }

    fn names(entries: &[FileEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.name.as_str()).collect()
    }

    #[test]
    fn case_insensitive_substring() {
        let filter = KeywordFilter::new(["minutes"]);
        let kept = filter.apply(files(&["March Minutes.pdf", "Budget.pdf", "MINUTES-april.pdf"]));
        assert_eq!(names(&kept), vec!["March Minutes.pdf", "MINUTES-april.pdf"]);
    }

    #[test]
    fn order_is_preserved_across_keywords() {
        let filter = KeywordFilter::new(["score", "parts"]);
        let kept = filter.apply(files(&["Parts.pdf", "Cover.pdf", "Full Score.pdf"]));
        assert_eq!(names(&kept), vec!["Parts.pdf", "Full Score.pdf"]);
    }

    #[test]
    fn first_keyword_wins() {
        let filter = KeywordFilter::new(["Score", "full"]);
        assert_eq!(filter.matching_keyword("Full Score.pdf"), Some("score"));
        assert_eq!(filter.matching_keyword("Fullness.pdf"), Some("full"));
        assert_eq!(filter.matching_keyword("Cover.pdf"), None);
    }

    #[test]
    fn full_case_folding() {
        let filter = KeywordFilter::new(["strasse"]);
        assert!(filter.matches("Straße Score.pdf"));

        let filter = KeywordFilter::new(["STRASSE"]);
        assert!(filter.matches("straße score.pdf"));

        let filter = KeywordFilter::new(["Straße"]);
        assert!(filter.matches("Strasse Parts.pdf"));
    }

    #[test]
    fn substring_not_word_boundary() {
        let filter = KeywordFilter::new(["act"]);
        assert!(filter.matches("Contract.pdf"));
    }

    #[test]
    fn filtering_is_idempotent() {
        let filter = KeywordFilter::new(["minutes", "agenda"]);
        let once = filter.apply(files(&["Agenda.pdf", "Minutes.pdf", "Photo.pdf"]));
        let twice = filter.apply(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn containers_never_match() {
        let filter = KeywordFilter::new(["minutes"]);
        let entries = vec![
            FileEntry::container("c", "Minutes", "application/vnd.google-apps.folder"),
            FileEntry::regular("f", "Minutes.pdf", PDF),
        ];
        let kept = filter.apply(entries);
        assert_eq!(names(&kept), vec!["Minutes.pdf"]);
    }

    #[test]
    fn empty_keywords_are_dropped() {
        let filter = KeywordFilter::new(["", "score"]);
        assert!(!filter.matches("Budget.pdf"));
        assert!(KeywordFilter::new(Vec::<String>::new()).is_empty());
    }
}
