use std::future::Future;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use serde::Deserialize;

use crate::config::DriveConfig;
use crate::drive::StorageProvider;
use crate::proxy::{self, PhotoDescriptor};

/// Where the wall session gets its photo listing from.
pub trait PhotoSource: Send + Sync + 'static {
    fn fetch(&self) -> impl Future<Output = Result<Vec<PhotoDescriptor>>> + Send;
}

/// Calls the list operation in-process, sharing the proxy's provider.
pub struct ProxySource<P> {
    provider: Arc<P>,
    drive: Arc<DriveConfig>,
}

impl<P: StorageProvider> ProxySource<P> {
    pub fn new(provider: Arc<P>, drive: Arc<DriveConfig>) -> Self {
        Self { provider, drive }
    }
}

impl<P: StorageProvider> PhotoSource for ProxySource<P> {
    async fn fetch(&self) -> Result<Vec<PhotoDescriptor>> {
        let list = proxy::list_photos(self.provider.as_ref(), &self.drive).await?;
        Ok(list.photos)
    }
}

/// Polls a remote server's `/api/photos` endpoint.
pub struct HttpSource {
    http: reqwest::Client,
    base: String,
}

#[derive(Deserialize)]
struct ListBody {
    #[serde(default)]
    photos: Option<Vec<PhotoDescriptor>>,
    #[serde(default)]
    error: Option<String>,
}

impl HttpSource {
    pub fn new(http: reqwest::Client, base: impl Into<String>) -> Self {
        let base = base.into().trim_end_matches('/').to_string();
        Self { http, base }
    }

    fn endpoint(&self) -> String {
        format!("{}/api/photos", self.base)
    }

    /// Image urls are server-relative; point them at the remote server.
    fn absolutize(&self, mut photo: PhotoDescriptor) -> PhotoDescriptor {
        if photo.url.starts_with('/') {
            photo.url = format!("{}{}", self.base, photo.url);
        }
        photo
    }
}

impl PhotoSource for HttpSource {
    async fn fetch(&self) -> Result<Vec<PhotoDescriptor>> {
        let url = self.endpoint();
        let body: ListBody = self
            .http
            .get(&url)
            .send()
            .await
            .with_context(|| format!("requesting {url}"))?
            .json()
            .await
            .with_context(|| format!("decoding listing from {url}"))?;
        match (body.photos, body.error) {
            (Some(photos), _) => Ok(photos.into_iter().map(|p| self.absolutize(p)).collect()),
            (None, Some(error)) => Err(anyhow!(error)),
            (None, None) => Err(anyhow!("listing from {url} carried no photos")),
        }
    }
}
