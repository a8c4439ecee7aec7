use std::path::Path;

use anyhow::Context;
use viwoods_core::ViwoodsClient;

use crate::config::{RunMode, SyncConfig};
use crate::sync::engine::TreeSynchronizer;
use crate::sync::ledger::SyncLedger;
use crate::sync::stats::{SyncReport, SyncScope};

pub struct SyncRuntime {
    config: SyncConfig,
    synchronizer: TreeSynchronizer,
}

impl SyncRuntime {
    pub async fn bootstrap(config: SyncConfig) -> anyhow::Result<Self> {
        tokio::fs::create_dir_all(&config.output_root)
            .await
            .with_context(|| format!("failed to create output dir at {:?}", config.output_root))?;

        let client = ViwoodsClient::new(&config.host, config.port)
            .context("invalid tablet address")?
            .with_timeouts(config.request_timeout, config.download_timeout);
        let ledger = SyncLedger::open_in(&config.output_root)
            .await
            .context("failed to open sync ledger")?;
        if config.force {
            tracing::warn!("force mode: clearing sync ledger");
            ledger.reset().await.context("failed to reset sync ledger")?;
        }

        let synchronizer =
            TreeSynchronizer::new(client, ledger, config.output_root.clone())
                .with_root_folders(config.root_folders.clone());

        Ok(Self {
            config,
            synchronizer,
        })
    }

    pub async fn run(&self) -> anyhow::Result<SyncReport> {
        tracing::info!(
            output = %self.config.output_root.display(),
            tablet = %format!("{}:{}", self.config.host, self.config.port),
            "sync starting"
        );
        let report = match &self.config.mode {
            RunMode::Full { include_all } => {
                if *include_all {
                    tracing::info!("mode: syncing all top-level folders");
                } else {
                    tracing::info!(
                        folders = %self.config.root_folders.join(", "),
                        "mode: syncing sync list (use --all for everything)"
                    );
                }
                self.synchronizer.sync_all(*include_all).await?
            }
            RunMode::Folder(folder) => self
                .synchronizer
                .sync_folder(folder)
                .await
                .with_context(|| format!("cannot sync folder {folder:?}"))?,
        };
        if !report.stats.is_clean() {
            tracing::warn!(failed = report.stats.failed, "some notes were not downloaded");
        }
        Ok(report)
    }

    pub fn output_root(&self) -> &Path {
        &self.config.output_root
    }
}

/// Human-readable closing summary of a run.
pub fn format_summary(report: &SyncReport, output_root: &Path) -> String {
    let mut lines = vec!["Sync complete".to_string()];
    match &report.scope {
        SyncScope::Full { filtered_roots, .. } => {
            lines.push(format!("Folders processed: {}", report.stats.folders));
            if !filtered_roots.is_empty() {
                lines.push(format!("Folders skipped:   {}", filtered_roots.join(", ")));
            }
        }
        SyncScope::Folder { path } => lines.push(format!("Folder:            {path}")),
    }
    lines.push(format!("Files downloaded:  {}", report.stats.downloaded));
    lines.push(format!("Files skipped:     {}", report.stats.skipped));
    lines.push(format!("Files failed:      {}", report.stats.failed));
    lines.push(format!(
        "Time elapsed:      {:.1}s",
        report.elapsed.as_secs_f64()
    ));
    lines.push(format!("Local directory:   {}", output_root.display()));
    if !report.stats.is_clean() {
        lines.push("Failed notes are retried on the next run.".to_string());
    }
    lines.join("\n")
}
