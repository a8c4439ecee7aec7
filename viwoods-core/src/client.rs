use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

pub const DEFAULT_PORT: u16 = 8090;
/// Container type used to list the top-level folders of the tablet.
pub const ROOT_APP_TYPE: &str = "root";
pub const ROOT_FOLDER_NAME: &str = "Home";
/// Container type assumed for a top-level entry that does not report one.
pub const DEFAULT_APP_TYPE: &str = "APP_PAPER";
pub const NOTE_EXTENSION: &str = "note";

const SUCCESS_CODE: i64 = 200;
const DEFAULT_LANGUAGE: &str = "en";
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Error)]
pub enum ViwoodsError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
    #[error("api returned {status}: {body}")]
    Api { status: StatusCode, body: String },
    #[error("api result code {code}: {}", .message.as_deref().unwrap_or("no message"))]
    ResultCode { code: i64, message: Option<String> },
    #[error("malformed response: {0}")]
    Payload(#[from] serde_json::Error),
    #[error("packageFile response carries no file path")]
    MissingFilePath,
    #[error("folder name must not be empty")]
    EmptyFolderName,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The call was rejected before anything was sent.
    InvalidRequest,
    Transport,
    Status,
    ResultCode,
    Payload,
}

#[derive(Clone)]
pub struct ViwoodsClient {
    http: Client,
    base_url: Url,
    language: String,
    request_timeout: Duration,
    download_timeout: Duration,
}

impl ViwoodsClient {
    pub fn new(host: &str, port: u16) -> Result<Self, ViwoodsError> {
        Self::with_base_url(&format!("http://{host}:{port}"))
    }

    pub fn with_base_url(base_url: &str) -> Result<Self, ViwoodsError> {
        Ok(Self {
            http: Client::new(),
            base_url: Url::parse(base_url)?,
            language: DEFAULT_LANGUAGE.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            download_timeout: DEFAULT_DOWNLOAD_TIMEOUT,
        })
    }

    /// Overrides the per-call timeouts. `request` bounds listing and resolve
    /// calls, `download` bounds the whole streamed transfer.
    pub fn with_timeouts(mut self, request: Duration, download: Duration) -> Self {
        self.request_timeout = request;
        self.download_timeout = download;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Lists the children of `folder_name` inside the `app_type` container.
    /// `folder_id` of `None` or `""` addresses the top level of the container.
    pub async fn list_child_folder(
        &self,
        app_type: &str,
        folder_name: &str,
        folder_id: Option<&str>,
    ) -> Result<Vec<RemoteEntry>, ViwoodsError> {
        if folder_name.is_empty() {
            return Err(ViwoodsError::EmptyFolderName);
        }
        let mut url = self.endpoint("/getChildFolderList")?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("appType", app_type);
            query.append_pair("folderName", folder_name);
            query.append_pair("language", &self.language);
            if let Some(folder_id) = folder_id.filter(|id| !id.is_empty()) {
                query.append_pair("folderId", folder_id);
            }
        }
        let response = self
            .http
            .get(url)
            .timeout(self.request_timeout)
            .send()
            .await?;
        let entries: Option<Vec<RemoteEntry>> = Self::handle_envelope(response).await?;
        Ok(entries.unwrap_or_default())
    }

    /// Asks the tablet to stage a note for download and returns the transient
    /// server-side path to pass to [`ViwoodsClient::download`].
    pub async fn package_file(&self, request: &PackageRequest<'_>) -> Result<String, ViwoodsError> {
        let file_name = note_file_name(request.file_name);
        let mut url = self.endpoint("/packageFile")?;
        url.query_pairs_mut()
            .append_pair("appType", request.app_type)
            .append_pair("fileUrl", request.note_id)
            .append_pair("fileFormat", NOTE_EXTENSION)
            .append_pair("fileName", &file_name)
            .append_pair("folderId", request.folder_id)
            .append_pair("isFolder", "false")
            .append_pair("childFileFormat", NOTE_EXTENSION);
        let response = self
            .http
            .get(url)
            .timeout(self.request_timeout)
            .send()
            .await?;
        let data: Option<serde_json::Value> = Self::handle_envelope(response).await?;
        match data {
            Some(serde_json::Value::String(path)) if !path.is_empty() => Ok(path),
            _ => Err(ViwoodsError::MissingFilePath),
        }
    }

    /// Starts a streamed download of a path returned by `package_file`.
    /// The body is left unread so callers can consume it chunk by chunk.
    pub async fn download(&self, file_path: &str) -> Result<reqwest::Response, ViwoodsError> {
        let mut url = self.endpoint("/download")?;
        url.query_pairs_mut().append_pair("filePath", file_path);
        let response = self
            .http
            .get(url)
            .timeout(self.download_timeout)
            .send()
            .await?;
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ViwoodsError::Api { status, body })
        }
    }

    fn endpoint(&self, path: &str) -> Result<Url, ViwoodsError> {
        Ok(self.base_url.join(path)?)
    }

    async fn handle_envelope<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<Option<T>, ViwoodsError> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ViwoodsError::Api { status, body });
        }
        let bytes = response.bytes().await?;
        let envelope: Envelope<T> = serde_json::from_slice(&bytes)?;
        if envelope.code != SUCCESS_CODE {
            return Err(ViwoodsError::ResultCode {
                code: envelope.code,
                message: envelope.msg,
            });
        }
        Ok(envelope.data)
    }
}

impl ViwoodsError {
    pub fn classification(&self) -> ErrorClass {
        match self {
            ViwoodsError::Request(err) if err.is_decode() => ErrorClass::Payload,
            ViwoodsError::Request(_) | ViwoodsError::Url(_) => ErrorClass::Transport,
            ViwoodsError::EmptyFolderName => ErrorClass::InvalidRequest,
            ViwoodsError::Api { .. } => ErrorClass::Status,
            ViwoodsError::ResultCode { .. } => ErrorClass::ResultCode,
            ViwoodsError::Payload(_) | ViwoodsError::MissingFilePath => ErrorClass::Payload,
        }
    }
}

/// Appends the `.note` extension unless the name already carries it.
pub fn note_file_name(name: &str) -> String {
    let suffix = format!(".{NOTE_EXTENSION}");
    if name.ends_with(&suffix) {
        name.to_string()
    } else {
        format!("{name}{suffix}")
    }
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    code: i64,
    data: Option<T>,
    #[serde(default)]
    msg: Option<String>,
}

/// One child returned by `getChildFolderList`.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RemoteEntry {
    pub file_name: String,
    #[serde(default)]
    pub is_folder: bool,
    #[serde(default)]
    pub note_id: String,
    #[serde(default)]
    pub update_time: i64,
    #[serde(default)]
    pub app_type: Option<String>,
}

impl RemoteEntry {
    pub fn app_type_or_default(&self) -> &str {
        self.app_type.as_deref().unwrap_or(DEFAULT_APP_TYPE)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PackageRequest<'a> {
    pub app_type: &'a str,
    pub note_id: &'a str,
    pub file_name: &'a str,
    pub folder_id: &'a str,
}
