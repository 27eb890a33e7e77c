//! End-to-end run: agenda → linked folders → resolve → filter → output folder.

use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{info, instrument, warn};

use agendafetch_agenda::LinkExtractor;
use agendafetch_drive::StorageBackend;
use agendafetch_shared::{
    AgendaFetchError, FolderRef, MatchGroup, OutputManifest, Result, RunConfig,
};

use crate::assembler::{AssembleResult, OutputAssembler};
use crate::filter::KeywordFilter;
use crate::resolver::FolderResolver;

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called after each linked folder has been resolved and filtered.
    fn folder_resolved(&self, name: &str, matched: usize, current: usize, total: usize);
    /// Called after each file is copied into the output folder.
    fn file_copied(&self, name: &str, current: usize, total: usize);
    /// Called when the pipeline completes.
    fn done(&self, result: &RunResult);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn folder_resolved(&self, _name: &str, _matched: usize, _current: usize, _total: usize) {}
    fn file_copied(&self, _name: &str, _current: usize, _total: usize) {}
    fn done(&self, _result: &RunResult) {}
}

/// Why a linked folder contributed nothing to the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    /// Resolution found no file with a matching name.
    NoMatches,
    /// Resolution failed for this folder only (cycle or depth bound).
    Unresolvable { detail: String },
}

/// A linked folder left out of the manifest.
#[derive(Debug, Clone, Serialize)]
pub struct SkippedFolder {
    pub folder: FolderRef,
    #[serde(flatten)]
    pub reason: SkipReason,
}

/// What a run would copy, computed without touching the output location.
#[derive(Debug, Clone, Serialize)]
pub struct Plan {
    /// Folder links read from the agenda, in document order.
    pub folders: Vec<FolderRef>,
    /// Contributing groups, in agenda order.
    pub manifest: OutputManifest,
    /// Folders that contributed nothing.
    pub skipped: Vec<SkippedFolder>,
}

/// Result of a full run.
#[derive(Debug, Serialize)]
pub struct RunResult {
    /// Number of folder links found in the agenda.
    pub folders_found: usize,
    pub manifest: OutputManifest,
    pub skipped: Vec<SkippedFolder>,
    /// `None` when the agenda had no folder links and the output was left untouched.
    pub output: Option<AssembleResult>,
    /// Total elapsed time.
    #[serde(skip)]
    pub elapsed: Duration,
}

/// Composes the pipeline stages over one storage backend.
pub struct Pipeline<'a, B> {
    backend: &'a B,
    config: RunConfig,
    extractor: LinkExtractor,
    resolver: FolderResolver<'a, B>,
    filter: KeywordFilter,
}

impl<'a, B: StorageBackend> Pipeline<'a, B> {
    /// Validate `config` and build every stage from it.
    pub fn new(backend: &'a B, config: RunConfig) -> Result<Self> {
        config.validate()?;

        let extractor = LinkExtractor::new(config.table)?;
        let resolver = FolderResolver::new(
            backend,
            config.target_mime_type.clone(),
            config.version_order,
            config.max_depth,
        );
        let filter = KeywordFilter::new(&config.keywords);
        if filter.is_empty() {
            return Err(AgendaFetchError::validation("every configured keyword is empty"));
        }

        Ok(Self {
            backend,
            config,
            extractor,
            resolver,
            filter,
        })
    }

    /// Export the agenda and read its folder links.
    ///
    /// A missing table is logged by the extractor and yields no folders.
    pub async fn extract_folders(&self) -> Result<Vec<FolderRef>> {
        let html = self.backend.export(&self.config.document_id).await?;
        Ok(self.extractor.extract(&html).into_folders())
    }

    /// Read the agenda and build the manifest without modifying anything.
    #[instrument(skip_all, fields(document = %self.config.document_id))]
    pub async fn plan(&self, progress: &dyn ProgressReporter) -> Result<Plan> {
        progress.phase("Reading agenda");
        let folders = self.extract_folders().await?;
        self.plan_for(folders, progress).await
    }

    async fn plan_for(&self, folders: Vec<FolderRef>, progress: &dyn ProgressReporter) -> Result<Plan> {
        progress.phase("Searching linked folders");

        let total = folders.len();
        let mut groups = Vec::new();
        let mut skipped = Vec::new();

        for (i, folder) in folders.iter().enumerate() {
            let files = match self.resolver.resolve(&folder.id).await {
                Ok(candidates) => self.filter.apply(candidates),
                Err(e) if e.is_folder_local() => {
                    warn!(folder = %folder.name, id = %folder.id, error = %e, "skipping folder");
                    skipped.push(SkippedFolder {
                        folder: folder.clone(),
                        reason: SkipReason::Unresolvable {
                            detail: e.to_string(),
                        },
                    });
                    progress.folder_resolved(&folder.name, 0, i + 1, total);
                    continue;
                }
                Err(e) => return Err(e),
            };

            let matched = files.len();
            if files.is_empty() {
                warn!(folder = %folder.name, id = %folder.id, "no matching files found");
                skipped.push(SkippedFolder {
                    folder: folder.clone(),
                    reason: SkipReason::NoMatches,
                });
            } else {
                info!(folder = %folder.name, files = matched, "matched files");
                groups.push(MatchGroup {
                    source: folder.clone(),
                    files,
                });
            }

            progress.folder_resolved(&folder.name, matched, i + 1, total);
        }

        Ok(Plan {
            folders,
            manifest: OutputManifest {
                parent_id: self.config.parent_id.clone(),
                folder_name: self.config.folder_name.clone(),
                groups,
            },
            skipped,
        })
    }

    /// Run the whole pipeline.
    ///
    /// 1. Export the agenda and read folder links (stop here if there are none)
    /// 2. Resolve each folder and filter by keyword
    /// 3. Replace the output folder and copy matches into it
    #[instrument(skip_all, fields(document = %self.config.document_id, output = %self.config.folder_name))]
    pub async fn run(&self, progress: &dyn ProgressReporter) -> Result<RunResult> {
        let start = Instant::now();
        info!("starting run");

        progress.phase("Reading agenda");
        let folders = self.extract_folders().await?;

        if folders.is_empty() {
            info!("no folder links in agenda; output folder left untouched");
            let result = RunResult {
                folders_found: 0,
                manifest: OutputManifest {
                    parent_id: self.config.parent_id.clone(),
                    folder_name: self.config.folder_name.clone(),
                    groups: Vec::new(),
                },
                skipped: Vec::new(),
                output: None,
                elapsed: start.elapsed(),
            };
            progress.done(&result);
            return Ok(result);
        }

        let folders_found = folders.len();
        let plan = self.plan_for(folders, progress).await?;

        if plan.manifest.is_empty() {
            warn!("no files matched; output folder will be empty");
        }

        progress.phase("Building output folder");
        let output = OutputAssembler::new(self.backend, self.config.prefix_style)
            .assemble(&plan.manifest, progress)
            .await?;

        let result = RunResult {
            folders_found,
            manifest: plan.manifest,
            skipped: plan.skipped,
            output: Some(output),
            elapsed: start.elapsed(),
        };

        info!(
            folders = result.folders_found,
            groups = result.manifest.groups.len(),
            files = result.manifest.file_count(),
            elapsed_ms = result.elapsed.as_millis() as u64,
            "run complete"
        );

        progress.done(&result);
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agendafetch_drive::{BackendCall, MemoryBackend};
    use agendafetch_shared::{PrefixStyle, VersionOrder};

    const PDF: &str = "application/pdf";
    const DOC: &str = "agenda-doc";

    fn link(id: &str, name: &str) -> String {
        format!(
            r#"<p><a href="https://www.google.com/url?q=https://drive.google.com/drive/folders/{id}?usp%3Dsharing&amp;sa=D">{name}</a></p>"#
        )
    }

    fn agenda(links: &[(&str, &str)]) -> String {
        let body: String = links.iter().map(|(id, name)| link(id, name)).collect();
        format!("<html><body>{body}</body></html>")
    }

    fn config(keywords: &[&str]) -> RunConfig {
        RunConfig {
            document_id: DOC.into(),
            table: None,
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            target_mime_type: PDF.into(),
            version_order: VersionOrder::Lexicographic,
            max_depth: 8,
            parent_id: "out-parent".into(),
            folder_name: "Pack".into(),
            prefix_style: PrefixStyle::Numeric,
        }
    }

    fn backend() -> MemoryBackend {
        let backend = MemoryBackend::new();
        backend.add_folder_with_id("out-parent", None, "Concerts");
        backend
    }

    fn output_folders(backend: &MemoryBackend) -> Vec<String> {
        backend
            .children("out-parent")
            .into_iter()
            .filter(|e| e.name == "Pack")
            .map(|e| e.id)
            .collect()
    }

    fn output_names(backend: &MemoryBackend) -> Vec<String> {
        let folders = output_folders(backend);
        assert_eq!(folders.len(), 1, "exactly one output folder");
        backend
            .children(&folders[0])
            .into_iter()
            .map(|e| e.name)
            .collect()
    }

    /// F1 holds v1 and v2; F2 holds an empty `draft` folder.
    fn minutes_scenario() -> MemoryBackend {
        let backend = backend();
        backend.add_document(DOC, &agenda(&[("F1", "Board"), ("F2", "Finance")]));
        let f1 = backend.add_folder_with_id("F1", None, "Board");
        let v1 = backend.add_folder(Some(&f1), "v1");
        let v2 = backend.add_folder(Some(&f1), "v2");
        backend.add_file(&v1, "February Minutes.pdf", PDF);
        backend.add_file(&v2, "March Minutes.pdf", PDF);
        backend.add_file(&v2, "Budget.pdf", PDF);
        let f2 = backend.add_folder_with_id("F2", None, "Finance");
        backend.add_folder(Some(&f2), "draft");
        backend
    }

    #[tokio::test]
    async fn minutes_scenario_copies_one_file() {
        let backend = minutes_scenario();
        let pipeline = Pipeline::new(&backend, config(&["minutes"])).unwrap();

        let result = pipeline.run(&SilentProgress).await.unwrap();

        assert_eq!(result.folders_found, 2);
        assert_eq!(result.manifest.groups.len(), 1);
        assert_eq!(result.skipped.len(), 1);
        assert_eq!(result.skipped[0].folder.id, "F2");
        assert_eq!(result.skipped[0].reason, SkipReason::NoMatches);
        assert_eq!(result.output.as_ref().unwrap().files_copied, 1);
        assert_eq!(output_names(&backend), vec!["0. March Minutes.pdf"]);
    }

    #[tokio::test]
    async fn rerun_replaces_output() {
        let backend = minutes_scenario();
        let pipeline = Pipeline::new(&backend, config(&["minutes"])).unwrap();

        let first = pipeline.run(&SilentProgress).await.unwrap();
        let second = pipeline.run(&SilentProgress).await.unwrap();

        let first_id = first.output.unwrap().folder_id;
        let second = second.output.unwrap();
        assert_eq!(second.folders_replaced, 1);
        assert!(!backend.contains(&first_id));
        assert_eq!(output_folders(&backend), vec![second.folder_id]);
        assert_eq!(output_names(&backend), vec!["0. March Minutes.pdf"]);
    }

    #[tokio::test]
    async fn no_links_leaves_output_untouched() {
        let backend = backend();
        backend.add_document(DOC, "<html><body><p>No links today.</p></body></html>");
        let stale = backend.add_folder(Some("out-parent"), "Pack");

        let pipeline = Pipeline::new(&backend, config(&["minutes"])).unwrap();
        let result = pipeline.run(&SilentProgress).await.unwrap();

        assert_eq!(result.folders_found, 0);
        assert!(result.output.is_none());
        assert!(backend.contains(&stale));
        assert!(
            backend
                .calls()
                .iter()
                .all(|c| matches!(c, BackendCall::Export(_))),
            "only the export call was made"
        );
    }

    #[tokio::test]
    async fn missing_table_is_treated_as_no_links() {
        let backend = backend();
        backend.add_document(DOC, &agenda(&[("F1", "Board")]));
        let mut cfg = config(&["minutes"]);
        cfg.table = Some(1);

        let pipeline = Pipeline::new(&backend, cfg).unwrap();
        let result = pipeline.run(&SilentProgress).await.unwrap();

        assert!(result.output.is_none());
        assert!(output_folders(&backend).is_empty());
    }

    #[tokio::test]
    async fn folders_without_matches_still_rebuild_output() {
        let backend = minutes_scenario();
        let pipeline = Pipeline::new(&backend, config(&["invoice"])).unwrap();

        let result = pipeline.run(&SilentProgress).await.unwrap();

        assert!(result.manifest.is_empty());
        assert_eq!(result.skipped.len(), 2);
        assert!(output_names(&backend).is_empty());
    }

    #[tokio::test]
    async fn skipped_folders_do_not_consume_an_index() {
        let backend = backend();
        backend.add_document(
            DOC,
            &agenda(&[("A", "Empty"), ("B", "Overture"), ("C", "Symphony")]),
        );
        backend.add_folder_with_id("A", None, "Empty");
        let b = backend.add_folder_with_id("B", None, "Overture");
        backend.add_file(&b, "Overture Score.pdf", PDF);
        let c = backend.add_folder_with_id("C", None, "Symphony");
        backend.add_file(&c, "Symphony Score.pdf", PDF);
        backend.add_file(&c, "Symphony Parts.pdf", PDF);

        let pipeline = Pipeline::new(&backend, config(&["score"])).unwrap();
        pipeline.run(&SilentProgress).await.unwrap();

        assert_eq!(
            output_names(&backend),
            vec!["0. Overture Score.pdf", "1. Symphony Score.pdf"]
        );
    }

    #[tokio::test]
    async fn cycle_in_one_folder_does_not_abort_others() {
        let backend = backend();
        backend.add_document(DOC, &agenda(&[("loop", "Loop"), ("ok", "Fine")]));
        let looped = backend.add_folder_with_id("loop", None, "Loop");
        let inner = backend.add_folder_with_id("inner", Some(&looped), "v1");
        backend.link(&inner, &looped);
        let ok = backend.add_folder_with_id("ok", None, "Fine");
        backend.add_file(&ok, "Minutes.pdf", PDF);

        let pipeline = Pipeline::new(&backend, config(&["minutes"])).unwrap();
        let result = pipeline.run(&SilentProgress).await.unwrap();

        assert_eq!(result.skipped.len(), 1);
        assert!(matches!(
            result.skipped[0].reason,
            SkipReason::Unresolvable { .. }
        ));
        assert_eq!(output_names(&backend), vec!["0. Minutes.pdf"]);
    }

    #[tokio::test]
    async fn copy_failure_aborts_run() {
        let backend = backend();
        backend.add_document(DOC, &agenda(&[("A", "Overture")]));
        let a = backend.add_folder_with_id("A", None, "Overture");
        backend.add_file(&a, "Score 1.pdf", PDF);
        backend.add_file(&a, "Score 2.pdf", PDF);
        backend.add_file(&a, "Score 3.pdf", PDF);
        backend.fail_copies_after(1);

        let pipeline = Pipeline::new(&backend, config(&["score"])).unwrap();
        let err = pipeline.run(&SilentProgress).await.unwrap_err();

        assert!(matches!(err, AgendaFetchError::Backend { status: 500, .. }));
        assert_eq!(output_names(&backend), vec!["0. Score 1.pdf"]);
    }

    #[tokio::test]
    async fn missing_agenda_document_propagates() {
        let backend = backend();
        let pipeline = Pipeline::new(&backend, config(&["minutes"])).unwrap();
        let err = pipeline.run(&SilentProgress).await.unwrap_err();
        assert!(matches!(err, AgendaFetchError::Backend { status: 404, .. }));
    }

    #[tokio::test]
    async fn plan_does_not_modify_storage() {
        let backend = minutes_scenario();
        let pipeline = Pipeline::new(&backend, config(&["minutes"])).unwrap();

        let plan = pipeline.plan(&SilentProgress).await.unwrap();

        assert_eq!(plan.folders.len(), 2);
        assert_eq!(plan.manifest.file_count(), 1);
        assert_eq!(plan.manifest.groups[0].source.id, "F1");
        assert!(output_folders(&backend).is_empty());
        assert!(backend.calls().iter().all(|c| matches!(
            c,
            BackendCall::Export(_) | BackendCall::List(_)
        )));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let backend = backend();
        let err = Pipeline::new(&backend, config(&[])).err().unwrap();
        assert!(matches!(err, AgendaFetchError::Config { .. }));

        let mut cfg = config(&["minutes"]);
        cfg.table = Some(0);
        assert!(Pipeline::new(&backend, cfg).is_err());
    }

    #[test]
    fn blank_keywords_are_rejected() {
        let backend = backend();
        let err = Pipeline::new(&backend, config(&["", ""])).err().unwrap();
        assert!(matches!(err, AgendaFetchError::Validation { .. }));
    }
}
