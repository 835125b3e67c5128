//! Contract with the external multimodal model.
//!
//! The client only moves bytes: it sends the encoded photo together with the
//! instruction block and returns whatever text the model produced. Nothing in
//! here trusts or parses that text; see `scan::interpret`.

pub mod gemini;
#[cfg(test)]
pub mod mock;
pub mod prompt;

use async_trait::async_trait;
use thiserror::Error;

use crate::images::EncodedImage;

pub use prompt::PromptSpec;

#[derive(Debug, Error)]
pub enum VisionError {
    /// Network failure, timeout or non-2xx answer. `status` is absent when no
    /// HTTP response was received.
    #[error("vision transport error (status {status:?}): {message}")]
    Transport {
        status: Option<u16>,
        message: String,
    },

    /// Missing or rejected credential, or a misconfigured endpoint/model.
    #[error("vision service misconfigured: {0}")]
    Config(String),
}

#[async_trait]
pub trait VisionClient: Send + Sync {
    /// Performs exactly one request. Callers must not retry on failure.
    async fn analyze(&self, image: &EncodedImage, prompt: &PromptSpec)
        -> Result<String, VisionError>;
}
