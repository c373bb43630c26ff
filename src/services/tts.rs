//! Text-to-speech over an OpenAI-compatible `/v1/audio/speech` endpoint

use async_trait::async_trait;
use std::time::Duration;

use crate::services::SpeechSynthesizer;
use crate::speech::pipeline::SpeechStage;
use crate::{Error, Result};

#[derive(Debug, Clone)]
pub struct TtsOptions {
    /// Base URL, e.g. `https://api.openai.com`
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub voice: String,
    pub speed: f32,
    pub timeout: Duration,
}

impl Default for TtsOptions {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com".to_string(),
            api_key: None,
            model: "tts-1".to_string(),
            voice: "alloy".to_string(),
            speed: 1.0,
            timeout: Duration::from_secs(30),
        }
    }
}

/// Synthesizes speech from text, returning MP3 bytes
pub struct HttpSynthesizer {
    client: reqwest::Client,
    options: TtsOptions,
}

impl HttpSynthesizer {
    /// Create a new synthesizer
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn new(options: TtsOptions) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(options.timeout).build()?;
        Ok(Self { client, options })
    }
}

#[async_trait]
impl SpeechSynthesizer for HttpSynthesizer {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        #[derive(serde::Serialize)]
        struct TtsRequest<'a> {
            model: &'a str,
            input: &'a str,
            voice: &'a str,
            speed: f32,
            response_format: &'a str,
        }

        let request = TtsRequest {
            model: &self.options.model,
            input: text,
            voice: &self.options.voice,
            speed: self.options.speed,
            response_format: "mp3",
        };

        let mut builder = self
            .client
            .post(format!(
                "{}/v1/audio/speech",
                self.options.base_url.trim_end_matches('/')
            ))
            .json(&request);
        if let Some(key) = &self.options.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::stage(
                SpeechStage::Synthesize,
                format!("TTS error {status}: {body}"),
            ));
        }

        let audio = response.bytes().await?;
        if audio.is_empty() {
            return Err(Error::stage(SpeechStage::Synthesize, "empty audio payload"));
        }
        Ok(audio.to_vec())
    }
}
