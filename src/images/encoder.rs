use std::path::PathBuf;
use std::sync::Arc;

use base64ct::{Base64, Encoding};
use bytes::Bytes;
use thiserror::Error;
use tracing::debug;

use crate::storage::StorageClient;

pub const MAX_IMAGE_BYTES: usize = 20 * 1024 * 1024;

/// Opaque handle to a photo the pipeline can read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageRef {
    Local(PathBuf),
    Stored(String),
}

impl ImageRef {
    /// Accepts `file://path`, `s3://key`, `storage:key` or a bare filesystem path.
    pub fn parse(handle: &str) -> Result<Self, EncodingError> {
        let handle = handle.trim();
        if handle.is_empty() {
            return Err(EncodingError::InvalidRef("empty image reference".into()));
        }
        if let Some(key) = handle
            .strip_prefix("s3://")
            .or_else(|| handle.strip_prefix("storage:"))
        {
            let key = key.trim_start_matches('/');
            if key.is_empty() {
                return Err(EncodingError::InvalidRef(handle.to_string()));
            }
            return Ok(Self::Stored(key.to_string()));
        }
        if let Some(path) = handle.strip_prefix("file://") {
            return Ok(Self::Local(PathBuf::from(path)));
        }
        if handle.contains("://") {
            return Err(EncodingError::InvalidRef(handle.to_string()));
        }
        Ok(Self::Local(PathBuf::from(handle)))
    }
}

impl std::fmt::Display for ImageRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImageRef::Local(p) => write!(f, "file://{}", p.display()),
            ImageRef::Stored(k) => write!(f, "s3://{}", k),
        }
    }
}

#[derive(Debug, Error)]
pub enum EncodingError {
    #[error("invalid image reference: {0}")]
    InvalidRef(String),
    #[error("image unreadable: {0}")]
    Unreadable(String),
    #[error("image is empty")]
    Empty,
    #[error("image too large: {0} bytes")]
    TooLarge(usize),
    #[error("not a supported image format")]
    UnsupportedFormat,
}

/// Transport-safe image payload handed to the vision client.
#[derive(Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub mime_type: &'static str,
    pub data_base64: String,
}

impl std::fmt::Debug for EncodedImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncodedImage")
            .field("mime_type", &self.mime_type)
            .field("len", &self.data_base64.len())
            .finish()
    }
}

#[derive(Clone)]
pub struct ImageEncoder {
    storage: Arc<dyn StorageClient>,
}

impl ImageEncoder {
    pub fn new(storage: Arc<dyn StorageClient>) -> Self {
        Self { storage }
    }

    pub async fn encode(&self, image: &ImageRef) -> Result<EncodedImage, EncodingError> {
        let bytes = match image {
            ImageRef::Local(path) => tokio::fs::read(path)
                .await
                .map(Bytes::from)
                .map_err(|e| EncodingError::Unreadable(format!("{}: {}", path.display(), e)))?,
            ImageRef::Stored(key) => self
                .storage
                .get_object(key)
                .await
                .map_err(|e| EncodingError::Unreadable(format!("{}: {:#}", key, e)))?,
        };
        let encoded = encode_bytes(&bytes)?;
        debug!(image = %image, bytes = bytes.len(), mime = encoded.mime_type, "image encoded");
        Ok(encoded)
    }
}

pub fn encode_bytes(bytes: &[u8]) -> Result<EncodedImage, EncodingError> {
    if bytes.is_empty() {
        return Err(EncodingError::Empty);
    }
    if bytes.len() > MAX_IMAGE_BYTES {
        return Err(EncodingError::TooLarge(bytes.len()));
    }
    let mime_type = sniff_mime(bytes).ok_or(EncodingError::UnsupportedFormat)?;
    Ok(EncodedImage {
        mime_type,
        data_base64: Base64::encode_string(bytes),
    })
}

pub fn sniff_mime(bytes: &[u8]) -> Option<&'static str> {
    match bytes {
        [0xFF, 0xD8, 0xFF, ..] => Some("image/jpeg"),
        [0x89, b'P', b'N', b'G', ..] => Some("image/png"),
        [b'G', b'I', b'F', b'8', ..] => Some("image/gif"),
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => Some("image/webp"),
        [_, _, _, _, b'f', b't', b'y', b'p', brand @ ..]
            if brand.starts_with(b"heic")
                || brand.starts_with(b"heix")
                || brand.starts_with(b"mif1")
                || brand.starts_with(b"msf1") =>
        {
            Some("image/heic")
        }
        _ => None,
    }
}

#[cfg(test)]
mod encoder_tests {
    use std::io::Write;

    use super::*;
    use crate::state::FakeStorage;

    const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F'];

    #[test]
    fn parse_handles_all_forms() {
        assert_eq!(
            ImageRef::parse("s3://scans/u/1.jpg").unwrap(),
            ImageRef::Stored("scans/u/1.jpg".into())
        );
        assert_eq!(
            ImageRef::parse("storage:a.png").unwrap(),
            ImageRef::Stored("a.png".into())
        );
        assert_eq!(
            ImageRef::parse("file:///tmp/x.jpg").unwrap(),
            ImageRef::Local("/tmp/x.jpg".into())
        );
        assert_eq!(
            ImageRef::parse("photos/x.jpg").unwrap(),
            ImageRef::Local("photos/x.jpg".into())
        );
        assert!(ImageRef::parse("  ").is_err());
        assert!(ImageRef::parse("s3://").is_err());
        assert!(ImageRef::parse("https://example.com/x.jpg").is_err());
    }

    #[test]
    fn sniff_known_formats() {
        assert_eq!(sniff_mime(JPEG), Some("image/jpeg"));
        assert_eq!(sniff_mime(b"\x89PNG\r\n\x1a\n"), Some("image/png"));
        assert_eq!(sniff_mime(b"RIFF\0\0\0\0WEBPVP8 "), Some("image/webp"));
        assert_eq!(sniff_mime(b"\0\0\0\x18ftypheic"), Some("image/heic"));
        assert_eq!(sniff_mime(b"GIF89a"), Some("image/gif"));
        assert_eq!(sniff_mime(b"hello world"), None);
    }

    #[test]
    fn encode_bytes_rejects_empty_and_non_images() {
        assert!(matches!(encode_bytes(&[]), Err(EncodingError::Empty)));
        assert!(matches!(
            encode_bytes(b"plain text"),
            Err(EncodingError::UnsupportedFormat)
        ));
        let too_big = vec![0xFF; MAX_IMAGE_BYTES + 1];
        assert!(matches!(
            encode_bytes(&too_big),
            Err(EncodingError::TooLarge(_))
        ));
    }

    #[test]
    fn encode_bytes_is_base64() {
        let enc = encode_bytes(JPEG).unwrap();
        assert_eq!(enc.mime_type, "image/jpeg");
        assert_eq!(Base64::decode_vec(&enc.data_base64).unwrap(), JPEG);
    }

    #[tokio::test]
    async fn encode_local_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(JPEG).unwrap();
        let encoder = ImageEncoder::new(Arc::new(FakeStorage::default()));

        let enc = encoder
            .encode(&ImageRef::Local(file.path().to_path_buf()))
            .await
            .unwrap();
        assert_eq!(enc.mime_type, "image/jpeg");
    }

    #[tokio::test]
    async fn missing_file_and_object_are_unreadable() {
        let encoder = ImageEncoder::new(Arc::new(FakeStorage::default()));
        let err = encoder
            .encode(&ImageRef::Local("/definitely/not/here.jpg".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, EncodingError::Unreadable(_)));

        let err = encoder
            .encode(&ImageRef::Stored("nope.jpg".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, EncodingError::Unreadable(_)));
    }

    #[tokio::test]
    async fn encode_stored_object() {
        let storage = FakeStorage::default();
        storage.insert("scans/a.jpg", JPEG);
        let encoder = ImageEncoder::new(Arc::new(storage));
        let enc = encoder
            .encode(&ImageRef::Stored("scans/a.jpg".into()))
            .await
            .unwrap();
        assert_eq!(Base64::decode_vec(&enc.data_base64).unwrap(), JPEG);
    }
}
