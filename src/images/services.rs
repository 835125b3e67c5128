use anyhow::Context;
use bytes::Bytes;
use serde::Serialize;
use uuid::Uuid;

use super::encoder::{sniff_mime, ImageRef};
use crate::storage::StorageClient;

const PRESIGN_TTL_SECS: u64 = 30 * 60;

/// Where the scanned photo can be fetched from by the client.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageLink {
    pub uri: String,
    pub thumbnail: Option<String>,
}

/// Stores an uploaded photo under `scans/<user>/` and returns a reference the
/// encoder can read back.
pub async fn store_upload(
    storage: &dyn StorageClient,
    user_id: Uuid,
    body: Bytes,
    content_type: Option<&str>,
) -> anyhow::Result<ImageRef> {
    anyhow::ensure!(!body.is_empty(), "empty upload");
    let content_type = content_type
        .filter(|ct| ext_from_mime(ct).is_some())
        .or_else(|| sniff_mime(&body))
        .unwrap_or("application/octet-stream");
    let ext = ext_from_mime(content_type).unwrap_or("bin");
    let key = format!("scans/{}/{}.{}", user_id, Uuid::new_v4(), ext);
    storage
        .put_object(&key, body, content_type)
        .await
        .with_context(|| format!("put_object {}", key))?;
    Ok(ImageRef::Stored(key))
}

/// Presigned link for stored photos; local files are returned as their file URI.
pub async fn link_for(storage: &dyn StorageClient, image: &ImageRef) -> anyhow::Result<ImageLink> {
    let uri = match image {
        ImageRef::Stored(key) => storage
            .presign_get(key, PRESIGN_TTL_SECS)
            .await
            .with_context(|| format!("presign url for {}", key))?,
        ImageRef::Local(_) => image.to_string(),
    };
    Ok(ImageLink {
        thumbnail: Some(uri.clone()),
        uri,
    })
}

fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/heic" => Some("heic"),
        "image/gif" => Some("gif"),
        _ => None,
    }
}

#[cfg(test)]
mod image_tests {
    use super::*;
    use crate::state::FakeStorage;

    #[test]
    fn test_ext_from_mime() {
        assert_eq!(ext_from_mime("image/jpeg"), Some("jpg"));
        assert_eq!(ext_from_mime("image/jpg"), Some("jpg"));
        assert_eq!(ext_from_mime("image/png"), Some("png"));
        assert_eq!(ext_from_mime("image/webp"), Some("webp"));
        assert_eq!(ext_from_mime("image/heic"), Some("heic"));
        assert_eq!(ext_from_mime("application/octet-stream"), None);
    }

    #[tokio::test]
    async fn store_upload_sniffs_missing_content_type() {
        let storage = FakeStorage::default();
        let user = Uuid::new_v4();
        let img = store_upload(&storage, user, Bytes::from_static(b"\x89PNG\r\n\x1a\n"), None)
            .await
            .unwrap();
        let ImageRef::Stored(key) = img else {
            panic!("expected stored ref");
        };
        assert!(key.starts_with(&format!("scans/{}/", user)));
        assert!(key.ends_with(".png"));
        assert!(storage.contains(&key));
    }

    #[tokio::test]
    async fn store_upload_rejects_empty_body() {
        let storage = FakeStorage::default();
        assert!(store_upload(&storage, Uuid::new_v4(), Bytes::new(), Some("image/jpeg"))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn link_for_presigns_stored_images() {
        let storage = FakeStorage::default();
        let link = link_for(&storage, &ImageRef::Stored("scans/x.jpg".into()))
            .await
            .unwrap();
        assert!(link.uri.contains("scans/x.jpg"));
        assert_eq!(link.thumbnail.as_deref(), Some(link.uri.as_str()));

        let local = link_for(&storage, &ImageRef::Local("/tmp/a.jpg".into()))
            .await
            .unwrap();
        assert_eq!(local.uri, "file:///tmp/a.jpg");
    }
}
