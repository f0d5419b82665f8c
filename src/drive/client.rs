use futures::{StreamExt, TryStreamExt};
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, warn};

use super::{DriveFile, ImageContent, ServiceAccount, StorageProvider};
use crate::config::DriveConfig;
use crate::error::ProxyError;

const LIST_FIELDS: &str = "files(id, name, mimeType, modifiedTime)";
const LIST_ORDER: &str = "modifiedTime desc";

/// Drive v3 client. Holds no per-request state; every call authenticates anew.
///
/// Missing credentials do not prevent construction; each call then fails
/// with a configuration error so the proxy can report it to its caller.
#[derive(Debug, Clone)]
pub struct DriveClient {
    http: reqwest::Client,
    api_base: String,
    account: Option<ServiceAccount>,
}

#[derive(Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileMeta {
    #[serde(default)]
    mime_type: Option<String>,
}

impl DriveClient {
    pub fn new(http: reqwest::Client, api_base: String, account: Option<ServiceAccount>) -> Self {
        Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            account,
        }
    }

    pub fn from_config(cfg: &DriveConfig) -> Result<Self, ProxyError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("photo-wall/", env!("CARGO_PKG_VERSION")))
            .timeout(cfg.request_timeout)
            .build()?;
        let account = match ServiceAccount::from_config(cfg) {
            Ok(account) => Some(account),
            Err(err) => {
                warn!(error = %err, "drive requests will fail until credentials are configured");
                None
            }
        };
        Ok(Self::new(http, cfg.api_base.clone(), account))
    }

    fn file_url(&self, file_id: &str) -> String {
        format!("{}/files/{}", self.api_base, file_id)
    }

    async fn get(
        &self,
        url: &str,
        query: &[(&str, &str)],
        subject: &str,
    ) -> Result<reqwest::Response, ProxyError> {
        let account = self.account.as_ref().ok_or_else(|| {
            ProxyError::Config("service account credentials are not configured".into())
        })?;
        let token = account.access_token(&self.http).await?;
        let response = self
            .http
            .get(url)
            .bearer_auth(token)
            .query(query)
            .send()
            .await?;
        check_status(response, subject)
    }
}

fn check_status(response: reqwest::Response, subject: &str) -> Result<reqwest::Response, ProxyError> {
    match response.status() {
        status if status.is_success() => Ok(response),
        StatusCode::NOT_FOUND => Err(ProxyError::NotFound(subject.to_string())),
        status => Err(ProxyError::Upstream(format!(
            "drive returned {status} for {subject}"
        ))),
    }
}

/// Drive query string for non-trashed images directly inside `folder_id`.
pub(crate) fn folder_query(folder_id: &str) -> String {
    let escaped = folder_id.replace('\\', "\\\\").replace('\'', "\\'");
    format!("'{escaped}' in parents and (mimeType contains 'image/') and trashed = false")
}

impl StorageProvider for DriveClient {
    async fn list_images(
        &self,
        folder_id: &str,
        page_size: u32,
    ) -> Result<Vec<DriveFile>, ProxyError> {
        let url = format!("{}/files", self.api_base);
        let query = folder_query(folder_id);
        let page_size = page_size.to_string();
        let response = self
            .get(
                &url,
                &[
                    ("q", query.as_str()),
                    ("fields", LIST_FIELDS),
                    ("orderBy", LIST_ORDER),
                    ("pageSize", page_size.as_str()),
                ],
                folder_id,
            )
            .await?;
        let list: FileList = response
            .json()
            .await
            .map_err(|err| ProxyError::Upstream(format!("unexpected file list shape: {err}")))?;
        debug!(folder_id, files = list.files.len(), "listed drive folder");
        Ok(list.files)
    }

    async fn fetch_image(&self, file_id: &str) -> Result<ImageContent, ProxyError> {
        let url = self.file_url(file_id);
        let meta: FileMeta = self
            .get(&url, &[("fields", "mimeType")], file_id)
            .await?
            .json()
            .await
            .map_err(|err| ProxyError::Upstream(format!("unexpected metadata shape: {err}")))?;
        let content = self.get(&url, &[("alt", "media")], file_id).await?;
        let body = content.bytes_stream().map_err(ProxyError::from).boxed();
        Ok(ImageContent {
            mime_type: meta.mime_type,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::folder_query;

    #[test]
    fn folder_query_filters_images_and_trash() {
        assert_eq!(
            folder_query("abc123"),
            "'abc123' in parents and (mimeType contains 'image/') and trashed = false"
        );
    }

    #[test]
    fn folder_query_escapes_quotes() {
        let query = folder_query("o'brien");
        assert!(query.starts_with("'o\\'brien' in parents"));
    }
}
