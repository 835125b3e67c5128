use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::{PromptSpec, VisionClient, VisionError};
use crate::images::EncodedImage;

/// What the scripted model answers.
#[derive(Debug, Clone)]
pub enum Reply {
    Text(String),
    Transport(Option<u16>),
    Config,
}

/// Vision client that replays a fixed reply and counts calls.
pub struct ScriptedVision {
    reply: Mutex<Reply>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl ScriptedVision {
    pub fn new(reply: Reply) -> Self {
        Self {
            reply: Mutex::new(reply),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn text(raw: &str) -> Self {
        Self::new(Reply::Text(raw.to_string()))
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn set_reply(&self, reply: Reply) {
        *self.reply.lock().unwrap() = reply;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VisionClient for ScriptedVision {
    async fn analyze(
        &self,
        _image: &EncodedImage,
        _prompt: &PromptSpec,
    ) -> Result<String, VisionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(d) = self.delay {
            tokio::time::sleep(d).await;
        }
        let reply = self.reply.lock().unwrap().clone();
        match reply {
            Reply::Text(t) => Ok(t),
            Reply::Transport(status) => Err(VisionError::Transport {
                status,
                message: "scripted transport failure".into(),
            }),
            Reply::Config => Err(VisionError::Config("scripted config failure".into())),
        }
    }
}
