//! Remote request/response backends consumed by the speech pipeline.

pub mod llm;
pub mod tts;

use async_trait::async_trait;

use crate::Result;

/// Text-generation capability: prompt in, one utterance out.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// Speech-synthesis capability: utterance in, encoded audio out.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>>;
}
