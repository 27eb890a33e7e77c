//! Output folder assembly.
//!
//! The output folder is rebuilt from scratch on every run: any folder with the
//! same name under the same parent is deleted first, then a fresh one is
//! created and the selected files are copied into it with a group prefix.

use tracing::{debug, info, instrument};

use agendafetch_drive::{ChildFilter, StorageBackend};
use agendafetch_shared::{OutputManifest, PrefixStyle, Result};

use crate::pipeline::ProgressReporter;

/// Output from a successful assembly.
#[derive(Debug, Clone, serde::Serialize)]
pub struct AssembleResult {
    /// Id of the freshly created output folder.
    pub folder_id: String,
    /// Number of files copied into it.
    pub files_copied: usize,
    /// Number of previous output folders deleted.
    pub folders_replaced: usize,
}

/// Name given to a copy: `"<prefix>. <original name>"`.
pub fn copy_name(style: PrefixStyle, group_index: usize, original: &str) -> String {
    format!("{}. {original}", style.label(group_index))
}

/// Creates and populates the output folder.
pub struct OutputAssembler<'a, B> {
    backend: &'a B,
    prefix_style: PrefixStyle,
}

impl<'a, B: StorageBackend> OutputAssembler<'a, B> {
    pub fn new(backend: &'a B, prefix_style: PrefixStyle) -> Self {
        Self {
            backend,
            prefix_style,
        }
    }

    /// Replace the output folder and copy every manifest file into it.
    ///
    /// Group `i` of the manifest is copied with prefix `i`. The first failed
    /// copy aborts the run; files already copied stay where they are.
    #[instrument(skip_all, fields(parent = %manifest.parent_id, name = %manifest.folder_name))]
    pub async fn assemble(
        &self,
        manifest: &OutputManifest,
        progress: &dyn ProgressReporter,
    ) -> Result<AssembleResult> {
        let folders_replaced = self
            .delete_existing(&manifest.parent_id, &manifest.folder_name)
            .await?;

        let folder_id = self
            .backend
            .create_container(&manifest.parent_id, &manifest.folder_name)
            .await?;
        info!(%folder_id, "created output folder");

        let total = manifest.file_count();
        let mut files_copied = 0;

        for (index, group) in manifest.groups.iter().enumerate() {
            for file in &group.files {
                let name = copy_name(self.prefix_style, index, &file.name);
                debug!(source = %file.id, %name, "copying file to output folder");

                self.backend.copy(&file.id, &name, &folder_id).await?;

                files_copied += 1;
                progress.file_copied(&name, files_copied, total);
            }
        }

        info!(%folder_id, files_copied, "copied files to output folder");

        Ok(AssembleResult {
            folder_id,
            files_copied,
            folders_replaced,
        })
    }

    /// Delete every folder named `name` directly under `parent_id`.
    async fn delete_existing(&self, parent_id: &str, name: &str) -> Result<usize> {
        let existing = self
            .backend
            .list_children(parent_id, &ChildFilter::container_named(name))
            .await?;

        for folder in &existing {
            info!(name = %folder.name, id = %folder.id, "deleting previous output folder");
            self.backend.delete(&folder.id).await?;
        }

        Ok(existing.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::SilentProgress;
    use agendafetch_drive::{BackendCall, MemoryBackend};
    use agendafetch_shared::{AgendaFetchError, FileEntry, FolderRef, MatchGroup};

    const PDF: &str = "application/pdf";

    struct Fixture {
        backend: MemoryBackend,
        parent: String,
        files: Vec<FileEntry>,
    }

    fn fixture() -> Fixture {
        let backend = MemoryBackend::new();
        let parent = backend.add_folder_with_id("parent", None, "Concerts");
        let library = backend.add_folder_with_id("library", None, "Library");
        let files = ["Overture.pdf", "Overture Parts.pdf", "Symphony.pdf"]
            .iter()
            .map(|name| {
                let id = backend.add_file(&library, name, PDF);
                FileEntry::regular(id, *name, PDF)
            })
            .collect();
        Fixture {
            backend,
            parent,
            files,
        }
    }

    fn manifest(fx: &Fixture) -> OutputManifest {
        OutputManifest {
            parent_id: fx.parent.clone(),
            folder_name: "Pack".into(),
            groups: vec![
                MatchGroup {
                    source: FolderRef::new("f1", "Overture"),
                    files: fx.files[..2].to_vec(),
                },
                MatchGroup {
                    source: FolderRef::new("f2", "Symphony"),
                    files: fx.files[2..].to_vec(),
                },
            ],
        }
    }

    fn output_names(backend: &MemoryBackend, folder_id: &str) -> Vec<String> {
        backend
            .children(folder_id)
            .into_iter()
            .map(|e| e.name)
            .collect()
    }

    #[test]
    fn copy_names_use_style() {
        assert_eq!(copy_name(PrefixStyle::Numeric, 0, "A.pdf"), "0. A.pdf");
        assert_eq!(copy_name(PrefixStyle::Alphabetic, 1, "B.pdf"), "b. B.pdf");
        // Original name kept byte for byte.
        assert_eq!(copy_name(PrefixStyle::Numeric, 3, "  x .pdf"), "3.   x .pdf");
    }

    #[tokio::test]
    async fn groups_get_sequential_prefixes() {
        let fx = fixture();
        let assembler = OutputAssembler::new(&fx.backend, PrefixStyle::Numeric);
        let result = assembler.assemble(&manifest(&fx), &SilentProgress).await.unwrap();

        assert_eq!(result.files_copied, 3);
        assert_eq!(result.folders_replaced, 0);
        assert_eq!(
            output_names(&fx.backend, &result.folder_id),
            vec!["0. Overture.pdf", "0. Overture Parts.pdf", "1. Symphony.pdf"]
        );
    }

    #[tokio::test]
    async fn existing_output_is_replaced() {
        let fx = fixture();
        let stale_a = fx.backend.add_folder(Some(&fx.parent), "Pack");
        fx.backend.add_file(&stale_a, "0. Old.pdf", PDF);
        let stale_b = fx.backend.add_folder(Some(&fx.parent), "Pack");
        let unrelated = fx.backend.add_folder(Some(&fx.parent), "Pack (archive)");
        let same_name_file = fx.backend.add_file(&fx.parent, "Pack", PDF);

        let assembler = OutputAssembler::new(&fx.backend, PrefixStyle::Numeric);
        let result = assembler.assemble(&manifest(&fx), &SilentProgress).await.unwrap();

        assert_eq!(result.folders_replaced, 2);
        assert!(!fx.backend.contains(&stale_a));
        assert!(!fx.backend.contains(&stale_b));
        assert!(fx.backend.contains(&unrelated));
        assert!(fx.backend.contains(&same_name_file));

        let packs: Vec<FileEntry> = fx
            .backend
            .children(&fx.parent)
            .into_iter()
            .filter(|e| e.name == "Pack" && e.is_container())
            .collect();
        assert_eq!(packs.len(), 1);
        assert_eq!(packs[0].id, result.folder_id);
    }

    #[tokio::test]
    async fn delete_happens_before_create() {
        let fx = fixture();
        fx.backend.add_folder(Some(&fx.parent), "Pack");

        let assembler = OutputAssembler::new(&fx.backend, PrefixStyle::Numeric);
        assembler.assemble(&manifest(&fx), &SilentProgress).await.unwrap();

        let calls = fx.backend.calls();
        let delete_at = calls
            .iter()
            .position(|c| matches!(c, BackendCall::Delete(_)))
            .expect("delete call");
        let create_at = calls
            .iter()
            .position(|c| matches!(c, BackendCall::Create { .. }))
            .expect("create call");
        assert!(delete_at < create_at);
    }

    #[tokio::test]
    async fn failed_copy_aborts_remaining() {
        let fx = fixture();
        fx.backend.fail_copies_after(1);

        let assembler = OutputAssembler::new(&fx.backend, PrefixStyle::Numeric);
        let err = assembler
            .assemble(&manifest(&fx), &SilentProgress)
            .await
            .unwrap_err();
        assert!(matches!(err, AgendaFetchError::Backend { status: 500, .. }));

        let copies = fx
            .backend
            .calls()
            .into_iter()
            .filter(|c| matches!(c, BackendCall::Copy { .. }))
            .count();
        assert_eq!(copies, 2, "one success, one failure, nothing after");

        // The partially populated folder is left in place.
        let packs: Vec<FileEntry> = fx
            .backend
            .children(&fx.parent)
            .into_iter()
            .filter(|e| e.name == "Pack")
            .collect();
        assert_eq!(packs.len(), 1);
        assert_eq!(output_names(&fx.backend, &packs[0].id), vec!["0. Overture.pdf"]);
    }

    #[tokio::test]
    async fn alphabetic_prefixes() {
        let fx = fixture();
        let assembler = OutputAssembler::new(&fx.backend, PrefixStyle::Alphabetic);
        let result = assembler.assemble(&manifest(&fx), &SilentProgress).await.unwrap();
        assert_eq!(
            output_names(&fx.backend, &result.folder_id),
            vec!["a. Overture.pdf", "a. Overture Parts.pdf", "b. Symphony.pdf"]
        );
    }
}
