use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanBase64Request {
    pub image_b64: String,
    #[serde(default)]
    pub content_type: Option<String>,
}

/// Scan a photo that was uploaded earlier, by its `s3://` reference.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanByRefRequest {
    pub image_ref: String,
}
