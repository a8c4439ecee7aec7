use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use viwoods_core::DEFAULT_PORT;

use crate::sync::engine::DEFAULT_ROOT_FOLDERS;

const DEFAULT_OUTPUT_DIR: &str = "./viwoods_sync";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
const DEFAULT_DOWNLOAD_TIMEOUT_SECS: u64 = 60;

/// Mirror the notes of a Viwoods tablet into a local directory.
///
/// Only new or modified notes are downloaded; everything else is skipped.
#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
    /// IP address or host name of the tablet
    #[arg(env = "VIWOODS_HOST")]
    pub host: String,

    #[arg(long, env = "VIWOODS_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Local output directory
    #[arg(short, long, env = "VIWOODS_OUTPUT_DIR", default_value = DEFAULT_OUTPUT_DIR)]
    pub output: String,

    /// Sync only this folder, e.g. "Paper/Papers/Unclassified Notes"
    #[arg(short, long)]
    pub folder: Option<String>,

    /// Sync every top-level folder, not only the sync list
    #[arg(long, conflicts_with = "folder")]
    pub all: bool,

    /// Forget previous syncs and download everything again
    #[arg(long)]
    pub force: bool,

    /// Top-level folders synced without --all [default: Paper,Daily,Meeting,Memo]
    #[arg(long = "root-folder", env = "VIWOODS_ROOT_FOLDERS", value_delimiter = ',')]
    pub root_folders: Option<Vec<String>>,

    /// Timeout in seconds for listing and packaging requests
    #[arg(long, env = "VIWOODS_REQUEST_TIMEOUT_SECS", default_value_t = DEFAULT_REQUEST_TIMEOUT_SECS)]
    pub request_timeout: u64,

    /// Timeout in seconds for a single note download
    #[arg(long, env = "VIWOODS_DOWNLOAD_TIMEOUT_SECS", default_value_t = DEFAULT_DOWNLOAD_TIMEOUT_SECS)]
    pub download_timeout: u64,

    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunMode {
    Full { include_all: bool },
    Folder(String),
}

#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub host: String,
    pub port: u16,
    pub output_root: PathBuf,
    pub mode: RunMode,
    pub force: bool,
    pub root_folders: Vec<String>,
    pub request_timeout: Duration,
    pub download_timeout: Duration,
}

impl SyncConfig {
    pub fn from_cli(cli: Cli) -> Self {
        let output_root = match dirs::home_dir() {
            Some(home) => expand_with_home(&cli.output, &home),
            None => PathBuf::from(&cli.output),
        };
        let mode = match cli.folder.filter(|folder| !folder.trim().is_empty()) {
            Some(folder) => RunMode::Folder(folder),
            None => RunMode::Full {
                include_all: cli.all,
            },
        };
        let root_folders = cli
            .root_folders
            .map(|names| {
                names
                    .into_iter()
                    .map(|name| name.trim().to_string())
                    .filter(|name| !name.is_empty())
                    .collect::<Vec<_>>()
            })
            .filter(|names| !names.is_empty())
            .unwrap_or_else(|| DEFAULT_ROOT_FOLDERS.iter().map(|s| s.to_string()).collect());

        Self {
            host: cli.host,
            port: cli.port,
            output_root,
            mode,
            force: cli.force,
            root_folders,
            request_timeout: positive_secs(cli.request_timeout, DEFAULT_REQUEST_TIMEOUT_SECS),
            download_timeout: positive_secs(cli.download_timeout, DEFAULT_DOWNLOAD_TIMEOUT_SECS),
        }
    }
}

fn expand_with_home(value: &str, home: &Path) -> PathBuf {
    if value == "~" {
        return home.to_path_buf();
    }
    if let Some(rest) = value.strip_prefix("~/") {
        return home.join(rest);
    }
    PathBuf::from(value)
}

fn positive_secs(value: u64, default: u64) -> Duration {
    Duration::from_secs(if value > 0 { value } else { default })
}
