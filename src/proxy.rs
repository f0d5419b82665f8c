//! The two stateless proxy operations behind `/api/photos` and `/api/image/{id}`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::config::DriveConfig;
use crate::drive::{DriveFile, ImageContent, StorageProvider};
use crate::error::ProxyError;

/// Content type served when the provider reports none.
pub const DEFAULT_MIME_TYPE: &str = "image/jpeg";
/// Browsers and shared caches may keep an image for a day.
pub const IMAGE_CACHE_CONTROL: &str = "public, max-age=86400, s-maxage=86400";

/// Client-visible summary of one image. Identity is `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoDescriptor {
    pub id: String,
    pub name: String,
    pub mime_type: String,
    pub modified_time: DateTime<Utc>,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhotoList {
    pub photos: Vec<PhotoDescriptor>,
    pub count: usize,
}

pub fn image_url(file_id: &str) -> String {
    format!("/api/image/{file_id}")
}

impl From<DriveFile> for PhotoDescriptor {
    fn from(file: DriveFile) -> Self {
        let url = image_url(&file.id);
        Self {
            id: file.id,
            name: file.name,
            mime_type: file.mime_type,
            modified_time: file.modified_time,
            url,
        }
    }
}

/// Lists the configured folder. Only the first page is returned; files past
/// `page_size` are omitted.
#[instrument(skip_all)]
pub async fn list_photos<P: StorageProvider>(
    provider: &P,
    drive: &DriveConfig,
) -> Result<PhotoList, ProxyError> {
    let folder_id = drive
        .folder_id()
        .ok_or_else(|| ProxyError::Config("drive folder id is not configured".into()))?;
    let files = provider.list_images(folder_id, drive.page_size).await?;
    let photos: Vec<PhotoDescriptor> = files
        .into_iter()
        .filter(|file| file.mime_type.starts_with("image/"))
        .map(PhotoDescriptor::from)
        .collect();
    Ok(PhotoList {
        count: photos.len(),
        photos,
    })
}

/// Fetches one image. Identifiers that cannot be Drive ids never reach the
/// provider.
#[instrument(skip(provider))]
pub async fn read_image<P: StorageProvider>(
    provider: &P,
    file_id: &str,
) -> Result<ImageContent, ProxyError> {
    if !is_valid_file_id(file_id) {
        return Err(ProxyError::NotFound(file_id.to_string()));
    }
    provider.fetch_image(file_id).await
}

pub fn is_valid_file_id(file_id: &str) -> bool {
    !file_id.is_empty()
        && file_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_points_back_at_image_route() {
        let file = DriveFile {
            id: "1AbC_d-9".into(),
            name: "stage.jpg".into(),
            mime_type: "image/jpeg".into(),
            modified_time: "2025-12-20T18:30:00Z".parse().expect("timestamp"),
        };
        let descriptor = PhotoDescriptor::from(file);
        assert_eq!(descriptor.url, "/api/image/1AbC_d-9");
        let json = serde_json::to_value(&descriptor).expect("serialize");
        assert_eq!(json["mimeType"], "image/jpeg");
        assert_eq!(json["modifiedTime"], "2025-12-20T18:30:00Z");
    }

    #[test]
    fn file_id_validation() {
        assert!(is_valid_file_id("1AbC_d-9"));
        assert!(!is_valid_file_id(""));
        assert!(!is_valid_file_id("../etc"));
        assert!(!is_valid_file_id("a?alt=media"));
    }
}
