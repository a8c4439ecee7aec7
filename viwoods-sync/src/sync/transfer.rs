use std::{
    io,
    path::{Path, PathBuf},
};

use futures_util::StreamExt;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use viwoods_core::{ErrorClass, PackageRequest, ViwoodsClient, ViwoodsError};

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("packageFile failed: {0}")]
    Resolve(#[source] ViwoodsError),
    #[error("download failed: {0}")]
    Download(#[source] ViwoodsError),
    #[error("download stream interrupted: {0}")]
    Stream(#[from] reqwest::Error),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("remote returned an empty file")]
    EmptyContent,
}

/// Coarse reason a fetch failed, for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    InvalidRequest,
    Transport,
    BadStatus,
    BadResultCode,
    BadPayload,
    EmptyContent,
    LocalIo,
}

impl FetchError {
    pub fn kind(&self) -> FailureKind {
        match self {
            FetchError::Resolve(err) | FetchError::Download(err) => match err.classification() {
                ErrorClass::InvalidRequest => FailureKind::InvalidRequest,
                ErrorClass::Transport => FailureKind::Transport,
                ErrorClass::Status => FailureKind::BadStatus,
                ErrorClass::ResultCode => FailureKind::BadResultCode,
                ErrorClass::Payload => FailureKind::BadPayload,
            },
            FetchError::Stream(_) => FailureKind::Transport,
            FetchError::Io(_) => FailureKind::LocalIo,
            FetchError::EmptyContent => FailureKind::EmptyContent,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FetchRequest<'a> {
    pub display_name: &'a str,
    pub note_id: &'a str,
    pub folder_id: &'a str,
    pub app_type: &'a str,
    pub destination: &'a Path,
}

/// Downloads single notes with the packageFile + download exchange.
#[derive(Clone)]
pub struct NoteFetcher {
    client: ViwoodsClient,
}

impl NoteFetcher {
    pub fn new(client: ViwoodsClient) -> Self {
        Self { client }
    }

    /// Fetches one note to `request.destination` and returns the number of
    /// bytes written. A transport or status failure keeps a previously mirrored
    /// copy; an empty download removes it.
    pub async fn fetch(&self, request: &FetchRequest<'_>) -> Result<u64, FetchError> {
        // The note id, not the display name, is the file reference.
        let file_path = self
            .client
            .package_file(&PackageRequest {
                app_type: request.app_type,
                note_id: request.note_id,
                file_name: request.display_name,
                folder_id: request.folder_id,
            })
            .await
            .map_err(FetchError::Resolve)?;
        let response = self
            .client
            .download(&file_path)
            .await
            .map_err(FetchError::Download)?;

        if let Some(parent) = request.destination.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let partial = partial_path(request.destination);
        match write_body(response, &partial).await {
            Ok(0) => {
                let _ = tokio::fs::remove_file(&partial).await;
                remove_if_present(request.destination).await?;
                Err(FetchError::EmptyContent)
            }
            Ok(written) => {
                tokio::fs::rename(&partial, request.destination).await?;
                Ok(written)
            }
            Err(err) => {
                let _ = tokio::fs::remove_file(&partial).await;
                Err(err)
            }
        }
    }
}

async fn write_body(response: reqwest::Response, target: &Path) -> Result<u64, FetchError> {
    let mut file = tokio::fs::File::create(target).await?;
    let mut stream = response.bytes_stream();
    let mut written = 0u64;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }

    file.flush().await?;
    file.sync_all().await?;
    Ok(written)
}

async fn remove_if_present(path: &Path) -> io::Result<()> {
    match tokio::fs::remove_file(path).await {
        Err(err) if err.kind() != io::ErrorKind::NotFound => Err(err),
        _ => Ok(()),
    }
}

fn partial_path(target: &Path) -> PathBuf {
    target.with_extension(format!(
        "{}partial",
        target
            .extension()
            .map(|ext| format!("{}.", ext.to_string_lossy()))
            .unwrap_or_default()
    ))
}
