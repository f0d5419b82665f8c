use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::body::{Body, Bytes, to_bytes};
use axum::http::{Request, StatusCode, header};
use futures::StreamExt;
use photo_wall::config::DriveConfig;
use photo_wall::drive::{DriveFile, ImageContent, StorageProvider};
use photo_wall::error::ProxyError;
use photo_wall::web::api_router;
use serde_json::Value;
use tower::ServiceExt;

#[derive(Default)]
struct FakeDrive {
    files: Vec<DriveFile>,
    images: HashMap<String, (Option<String>, Vec<u8>)>,
    upstream_down: bool,
    list_calls: Mutex<Vec<(String, u32)>>,
}

impl StorageProvider for FakeDrive {
    async fn list_images(&self, folder_id: &str, page_size: u32) -> Result<Vec<DriveFile>, ProxyError> {
        self.list_calls
            .lock()
            .unwrap()
            .push((folder_id.to_string(), page_size));
        if self.upstream_down {
            return Err(ProxyError::Upstream("drive returned 503".into()));
        }
        Ok(self.files.clone())
    }

    async fn fetch_image(&self, file_id: &str) -> Result<ImageContent, ProxyError> {
        let (mime_type, bytes) = self
            .images
            .get(file_id)
            .cloned()
            .ok_or_else(|| ProxyError::NotFound(file_id.to_string()))?;
        Ok(ImageContent {
            mime_type,
            body: futures::stream::once(async move { Ok(Bytes::from(bytes)) }).boxed(),
        })
    }
}

fn file(id: &str, mime: &str, modified: &str) -> DriveFile {
    DriveFile {
        id: id.to_string(),
        name: format!("{id}.jpg"),
        mime_type: mime.to_string(),
        modified_time: modified.parse().unwrap(),
    }
}

fn drive_config(folder: Option<&str>) -> Arc<DriveConfig> {
    Arc::new(DriveConfig {
        folder_id: folder.map(str::to_string),
        ..DriveConfig::default()
    })
}

async fn get(router: axum::Router, uri: &str) -> (StatusCode, axum::http::HeaderMap, Bytes) {
    let resp = router
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = resp.status();
    let headers = resp.headers().clone();
    let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, headers, body)
}

#[tokio::test]
async fn lists_folder_images_as_descriptors() {
    let drive = Arc::new(FakeDrive {
        files: vec![
            file("newest", "image/png", "2025-12-20T21:00:00Z"),
            file("older", "image/jpeg", "2025-12-20T19:00:00Z"),
        ],
        ..FakeDrive::default()
    });
    let router = api_router(Arc::clone(&drive), drive_config(Some("folder-1")));

    let (status, _, body) = get(router, "/api/photos").await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["count"], 2);
    assert_eq!(json["photos"][0]["id"], "newest");
    assert_eq!(json["photos"][0]["url"], "/api/image/newest");
    assert_eq!(json["photos"][0]["mimeType"], "image/png");
    assert_eq!(json["photos"][1]["modifiedTime"], "2025-12-20T19:00:00Z");

    let calls = drive.list_calls.lock().unwrap().clone();
    assert_eq!(calls, vec![("folder-1".to_string(), 100)]);
}

#[tokio::test]
async fn missing_folder_is_a_configuration_error() {
    let drive = Arc::new(FakeDrive::default());
    let router = api_router(Arc::clone(&drive), drive_config(None));

    let (status, _, body) = get(router, "/api/photos").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let json: Value = serde_json::from_slice(&body).unwrap();
    let message = json["error"].as_str().unwrap();
    assert!(message.contains("configuration error"), "{message}");
    assert!(drive.list_calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn upstream_failure_reports_error_body() {
    let drive = Arc::new(FakeDrive {
        upstream_down: true,
        ..FakeDrive::default()
    });
    let router = api_router(drive, drive_config(Some("folder-1")));

    let (status, _, body) = get(router, "/api/photos").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert!(json["error"].as_str().unwrap().contains("503"));
}

#[tokio::test]
async fn serves_image_bytes_with_cache_headers() {
    let mut images = HashMap::new();
    images.insert(
        "abc".to_string(),
        (Some("image/png".to_string()), vec![0x89, b'P', b'N', b'G']),
    );
    images.insert("plain".to_string(), (None, vec![0xff, 0xd8]));
    let drive = Arc::new(FakeDrive {
        images,
        ..FakeDrive::default()
    });

    let router = api_router(Arc::clone(&drive), drive_config(Some("folder-1")));
    let (status, headers, body) = get(router, "/api/image/abc").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "image/png");
    assert_eq!(
        headers[header::CACHE_CONTROL],
        "public, max-age=86400, s-maxage=86400"
    );
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    assert_eq!(&body[..], &[0x89, b'P', b'N', b'G']);

    let router = api_router(drive, drive_config(Some("folder-1")));
    let (status, headers, _) = get(router, "/api/image/plain").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "image/jpeg");
}

#[tokio::test]
async fn unknown_image_is_a_json_failure() {
    let drive = Arc::new(FakeDrive::default());
    let router = api_router(Arc::clone(&drive), drive_config(Some("folder-1")));
    let (status, _, body) = get(router, "/api/image/missing").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["error"], "Failed to load image");

    let router = api_router(drive, drive_config(Some("folder-1")));
    let (status, _, _) = get(router, "/api/image/bad%27id").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
