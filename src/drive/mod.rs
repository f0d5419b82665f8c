//! Google Drive access for the storage proxy.
//!
//! [`StorageProvider`] is the seam the web layer and the wall session depend
//! on; [`DriveClient`] satisfies it against the Drive v3 REST API.

mod auth;
mod client;

use std::future::Future;

use axum::body::Bytes;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use serde::Deserialize;

use crate::error::ProxyError;

pub use auth::ServiceAccount;
pub use client::DriveClient;

/// Scope requested for every access token.
pub const DRIVE_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/drive.readonly";

/// One image file as listed by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    pub id: String,
    pub name: String,
    pub mime_type: String,
    pub modified_time: DateTime<Utc>,
}

pub type ByteStream = BoxStream<'static, Result<Bytes, ProxyError>>;

/// Raw image content plus the provider's mime type, if it reported one.
pub struct ImageContent {
    pub mime_type: Option<String>,
    pub body: ByteStream,
}

/// Read-only view of a folder of images held by an external provider.
pub trait StorageProvider: Send + Sync + 'static {
    /// Image files in `folder_id`, newest modification first, at most
    /// `page_size` entries. Trashed files are excluded.
    fn list_images(
        &self,
        folder_id: &str,
        page_size: u32,
    ) -> impl Future<Output = Result<Vec<DriveFile>, ProxyError>> + Send;

    /// Metadata lookup followed by the raw content of a single file.
    fn fetch_image(
        &self,
        file_id: &str,
    ) -> impl Future<Output = Result<ImageContent, ProxyError>> + Send;
}
