use std::path::{Path, PathBuf};
use std::time::Instant;

use thiserror::Error;
use viwoods_core::{RemoteEntry, ViwoodsClient};

use super::ledger::{LedgerError, SyncLedger};
use super::listing::DirectoryLister;
use super::paths::{
    PathError, mirror_child, mirror_dir_for, mirror_file, remote_identity, split_folder_path,
};
use super::stats::{SyncReport, SyncScope, SyncStats};
use super::transfer::{FetchRequest, NoteFetcher};

/// Top-level containers mirrored when the caller does not ask for all of them.
pub const DEFAULT_ROOT_FOLDERS: [&str; 4] = ["Paper", "Daily", "Meeting", "Memo"];

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("path error: {0}")]
    Path(#[from] PathError),
    #[error("root folder not found: {0}")]
    RootNotFound(String),
    #[error("folder not found: {0}")]
    FolderNotFound(String),
}

/// One folder being mirrored.
struct Frame<'a> {
    app_type: &'a str,
    folder_name: &'a str,
    folder_id: &'a str,
    local_dir: &'a Path,
    trail: &'a str,
}

pub struct TreeSynchronizer {
    lister: DirectoryLister,
    fetcher: NoteFetcher,
    ledger: SyncLedger,
    output_root: PathBuf,
    root_folders: Vec<String>,
}

impl TreeSynchronizer {
    pub fn new(client: ViwoodsClient, ledger: SyncLedger, output_root: PathBuf) -> Self {
        Self {
            lister: DirectoryLister::new(client.clone()),
            fetcher: NoteFetcher::new(client),
            ledger,
            output_root,
            root_folders: DEFAULT_ROOT_FOLDERS.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn with_root_folders(mut self, root_folders: Vec<String>) -> Self {
        self.root_folders = root_folders;
        self
    }

    pub fn ledger(&self) -> &SyncLedger {
        &self.ledger
    }

    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    /// Mirrors every top-level container on the allow-list, or all of them
    /// when `include_all` is set.
    pub async fn sync_all(&self, include_all: bool) -> Result<SyncReport, EngineError> {
        let started = Instant::now();
        let mut stats = SyncStats::default();
        let mut filtered_roots = Vec::new();

        for root in self.lister.list_root().await {
            if !include_all && !self.root_folders.iter().any(|name| *name == root.file_name) {
                tracing::info!(root = %root.file_name, "skipping: not in sync list");
                filtered_roots.push(root.file_name);
                continue;
            }
            let local_dir = match mirror_child(&self.output_root, &root.file_name) {
                Ok(dir) => dir,
                Err(err) => {
                    tracing::warn!(root = %root.file_name, "skipping top-level folder: {err}");
                    continue;
                }
            };

            tracing::info!(root = %root.file_name, app_type = root.app_type_or_default(), "syncing");
            self.sync_tree(
                &Frame {
                    app_type: root.app_type_or_default(),
                    folder_name: &root.file_name,
                    folder_id: "",
                    local_dir: &local_dir,
                    trail: &root.file_name,
                },
                &mut stats,
            )
            .await?;
        }

        Ok(SyncReport {
            scope: SyncScope::Full {
                include_all,
                filtered_roots,
            },
            stats,
            elapsed: started.elapsed(),
        })
    }

    /// Mirrors only the subtree at `folder_path`, e.g. `Paper/Papers/Unclassified Notes`.
    /// Nothing is traversed unless every segment resolves.
    pub async fn sync_folder(&self, folder_path: &str) -> Result<SyncReport, EngineError> {
        let started = Instant::now();
        let segments = split_folder_path(folder_path)?;
        let root_name = segments[0];

        // The root listing is the only source of the container type here.
        let root = self
            .lister
            .list_root()
            .await
            .into_iter()
            .find(|entry| entry.file_name == root_name);
        let Some(app_type) = root.as_ref().and_then(|entry| entry.app_type.as_deref()) else {
            tracing::error!(root = root_name, "root folder not found");
            return Err(EngineError::RootNotFound(root_name.to_string()));
        };

        let mut folder_id = String::new();
        let mut current = self.lister.list(app_type, root_name, None).await;
        for segment in &segments[1..] {
            let Some(found) = find_folder(&current, segment) else {
                tracing::error!(folder = segment, "folder not found");
                return Err(EngineError::FolderNotFound((*segment).to_string()));
            };
            folder_id = found.note_id.clone();
            current = self.lister.list(app_type, segment, Some(&folder_id)).await;
        }

        let local_dir = mirror_dir_for(&self.output_root, &segments)?;
        let trail = segments.join("/");
        let mut stats = SyncStats::default();
        tracing::info!(folder = %trail, app_type, "syncing");
        self.sync_tree(
            &Frame {
                app_type,
                folder_name: segments[segments.len() - 1],
                folder_id: &folder_id,
                local_dir: &local_dir,
                trail: &trail,
            },
            &mut stats,
        )
        .await?;

        Ok(SyncReport {
            scope: SyncScope::Folder { path: trail },
            stats,
            elapsed: started.elapsed(),
        })
    }

    async fn sync_tree(&self, frame: &Frame<'_>, stats: &mut SyncStats) -> Result<(), EngineError> {
        // Folders are mirrored even when they turn out empty.
        tokio::fs::create_dir_all(frame.local_dir).await?;

        let entries = self
            .lister
            .list(frame.app_type, frame.folder_name, Some(frame.folder_id))
            .await;

        for entry in &entries {
            if !entry.is_folder {
                self.sync_note(frame, entry, stats).await?;
                continue;
            }

            let child_dir = match mirror_child(frame.local_dir, &entry.file_name) {
                Ok(dir) => dir,
                Err(err) => {
                    tracing::warn!(parent = frame.trail, "skipping folder: {err}");
                    continue;
                }
            };
            stats.folders += 1;
            let trail = format!("{}/{}", frame.trail, entry.file_name);
            tracing::info!(folder = %trail, "entering folder");

            Box::pin(self.sync_tree(
                &Frame {
                    app_type: frame.app_type,
                    folder_name: &entry.file_name,
                    folder_id: &entry.note_id,
                    local_dir: &child_dir,
                    trail: &trail,
                },
                stats,
            ))
            .await?;
        }

        Ok(())
    }

    async fn sync_note(
        &self,
        frame: &Frame<'_>,
        entry: &RemoteEntry,
        stats: &mut SyncStats,
    ) -> Result<(), EngineError> {
        let local_file = match mirror_file(frame.local_dir, &entry.file_name) {
            Ok(path) => path,
            Err(err) => {
                tracing::warn!(folder = frame.trail, "cannot mirror note: {err}");
                stats.failed += 1;
                return Ok(());
            }
        };
        let remote_path = remote_identity(
            frame.app_type,
            frame.folder_id,
            &entry.note_id,
            &entry.file_name,
        );

        // Both the ledger and the local copy must agree before skipping.
        if self
            .ledger
            .is_up_to_date(&remote_path, entry.update_time)
            .await?
            && tokio::fs::try_exists(&local_file).await.unwrap_or(false)
        {
            let size = tokio::fs::metadata(&local_file)
                .await
                .map(|meta| meta.len())
                .unwrap_or_default();
            tracing::info!(file = %local_file.display(), size, "cached");
            stats.skipped += 1;
            return Ok(());
        }

        let fetched = self
            .fetcher
            .fetch(&FetchRequest {
                display_name: &entry.file_name,
                note_id: &entry.note_id,
                folder_id: frame.folder_id,
                app_type: frame.app_type,
                destination: &local_file,
            })
            .await;

        match fetched {
            Ok(size) => {
                self.ledger
                    .record_sync(
                        &remote_path,
                        &entry.note_id,
                        entry.update_time,
                        size,
                        &local_file,
                    )
                    .await?;
                tracing::info!(file = %local_file.display(), size, "downloaded");
                stats.downloaded += 1;
            }
            Err(err) => {
                tracing::warn!(
                    file = %local_file.display(),
                    kind = ?err.kind(),
                    "download failed: {err}"
                );
                stats.failed += 1;
            }
        }
        Ok(())
    }
}

fn find_folder<'a>(entries: &'a [RemoteEntry], name: &str) -> Option<&'a RemoteEntry> {
    entries
        .iter()
        .find(|entry| entry.is_folder && entry.file_name == name)
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
