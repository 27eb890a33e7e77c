//! Agenda document reading: pulls linked folders out of an exported HTML agenda.
//!
//! The agenda is exported from Drive as HTML. Every hyperlink whose target is
//! a Drive folder becomes a [`FolderRef`]; everything else is ignored. The scan
//! can be narrowed to one table of the document, which is how agendas keep the
//! running order separate from incidental links.

mod link;

use std::sync::LazyLock;

use agendafetch_shared::{AgendaFetchError, FolderRef, Result};
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, error, info};

pub use link::folder_id_from_href;

/// All anchors carrying an `href`.
static LINK_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("link selector"));

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

/// Outcome of reading folder links from an agenda.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    /// Folder links in document order (possibly empty).
    Found(Vec<FolderRef>),
    /// The requested table does not exist in the document.
    TableNotFound {
        /// The 1-indexed table that was asked for.
        table: u32,
    },
}

impl Extraction {
    /// Collapse to the folder list; a missing table yields no folders.
    pub fn into_folders(self) -> Vec<FolderRef> {
        match self {
            Self::Found(folders) => folders,
            Self::TableNotFound { .. } => Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// LinkExtractor
// ---------------------------------------------------------------------------

/// Reads folder references from exported agenda HTML.
#[derive(Debug, Clone)]
pub struct LinkExtractor {
    table: Option<(u32, Selector)>,
}

impl LinkExtractor {
    /// Create an extractor, optionally restricted to the `table`-th table (1-indexed).
    pub fn new(table: Option<u32>) -> Result<Self> {
        let table = match table {
            Some(0) => {
                return Err(AgendaFetchError::validation(
                    "table selector is 1-indexed; use no selector to read the whole document",
                ));
            }
            Some(n) => {
                let sel = Selector::parse(&format!("table:nth-of-type({n})")).map_err(|e| {
                    AgendaFetchError::parse(format!("invalid table selector {n}: {e}"))
                })?;
                Some((n, sel))
            }
            None => None,
        };

        Ok(Self { table })
    }

    /// Extract folder references from `html` in document order.
    ///
    /// Duplicate folder ids are kept; link text is taken verbatim.
    pub fn extract(&self, html: &str) -> Extraction {
        let doc = Html::parse_document(html);

        let folders = match &self.table {
            Some((n, sel)) => match doc.select(sel).next() {
                Some(table) => collect_folders(table.select(&LINK_SEL)),
                None => {
                    error!(table = n, "table could not be found in the agenda document");
                    return Extraction::TableNotFound { table: *n };
                }
            },
            None => collect_folders(doc.select(&LINK_SEL)),
        };

        info!(folders = folders.len(), "extracted folder links from agenda");
        Extraction::Found(folders)
    }
}

fn collect_folders<'a>(links: impl Iterator<Item = ElementRef<'a>>) -> Vec<FolderRef> {
    let mut folders = Vec::new();

    for link in links {
        let text = link.text().next().unwrap_or_default();
        let Some(href) = link.value().attr("href") else {
            continue;
        };

        match folder_id_from_href(href) {
            Some(id) => folders.push(FolderRef::new(id, text)),
            None => debug!(link = %text, "no folder id found in link, skipping"),
        }
    }

    folders
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load_fixture(name: &str) -> String {
        let path = format!("../../../fixtures/html/{name}");
        std::fs::read_to_string(&path).unwrap_or_else(|_| panic!("missing fixture: {path}"))
    }

    #[test]
    fn whole_document_in_order() {
        let html = load_fixture("agenda.html");
        let extractor = LinkExtractor::new(None).unwrap();
        let folders = extractor.extract(&html).into_folders();

        let ids: Vec<&str> = folders.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["1WarmUpFolder", "1OvertureFolder", "1SymphonyFolder"]);
        assert_eq!(folders[0].name, "Warm-up Chorales");
    }

    #[test]
    fn restricted_to_second_table() {
        let html = load_fixture("agenda.html");
        let extractor = LinkExtractor::new(Some(2)).unwrap();

        match extractor.extract(&html) {
            Extraction::Found(folders) => {
                assert_eq!(folders.len(), 2);
                assert_eq!(folders[0], FolderRef::new("1OvertureFolder", "Festive Overture"));
                // Link text is not trimmed.
                assert_eq!(folders[1].name, " Symphony No. 5 ");
            }
            other => panic!("expected Found, got {other:?}"),
        }
    }

    #[test]
    fn missing_table_is_reported() {
        let html = load_fixture("agenda.html");
        let extractor = LinkExtractor::new(Some(3)).unwrap();
        let result = extractor.extract(&html);
        assert_eq!(result, Extraction::TableNotFound { table: 3 });
        assert!(result.into_folders().is_empty());
    }

    #[test]
    fn zero_table_selector_rejected() {
        assert!(LinkExtractor::new(Some(0)).is_err());
    }

    #[test]
    fn duplicates_are_kept() {
        let html = r#"<html><body>
            <a href="https://www.google.com/url?q=https://drive.google.com/drive/folders/AAA&amp;sa=D">First</a>
            <a href="https://www.google.com/url?q=https://drive.google.com/drive/folders/AAA&amp;sa=D">Again</a>
        </body></html>"#;
        let folders = LinkExtractor::new(None).unwrap().extract(html).into_folders();
        assert_eq!(folders.len(), 2);
        assert_eq!(folders[0].id, folders[1].id);
        assert_eq!(folders[1].name, "Again");
    }

    #[test]
    fn first_text_node_only() {
        let html = r#"<html><body>
            <a href="https://www.google.com/url?q=https://drive.google.com/drive/folders/BBB&amp;sa=D">Act <b>Two</b></a>
            <a href="https://www.google.com/url?q=https://drive.google.com/drive/folders/CCC&amp;sa=D"></a>
        </body></html>"#;
        let folders = LinkExtractor::new(None).unwrap().extract(html).into_folders();
        assert_eq!(folders[0].name, "Act ");
        assert_eq!(folders[1].name, "");
    }

    #[test]
    fn no_links_yields_empty() {
        let html = "<html><body><p>Nothing linked today.</p></body></html>";
        let result = LinkExtractor::new(None).unwrap().extract(html);
        assert_eq!(result, Extraction::Found(vec![]));
    }
}
