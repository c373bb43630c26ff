use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::services::TextGenerator;
use crate::speech::pipeline::SpeechStage;
use crate::{Error, Result};

const SYSTEM_PROMPT: &str = "You are a small companion robot with a face. You answer in one short, warm, casual sentence and nothing else.";

#[derive(Debug, Clone)]
pub struct LlmOptions {
    pub base_url: String,
    pub n_predict: usize,
    pub temperature: f32,
    pub timeout: Duration,
}

impl Default for LlmOptions {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            n_predict: 64,
            temperature: 0.8,
            timeout: Duration::from_secs(20),
        }
    }
}

/// llama-server `/completion` client.
#[derive(Clone)]
pub struct LLMService {
    client: Client,
    options: LlmOptions,
}

#[derive(Serialize)]
struct CompletionRequest {
    prompt: String,
    stream: bool,
    n_predict: usize,
    temperature: f32,
    stop: Vec<String>,
}

#[derive(Deserialize)]
struct CompletionResponse {
    content: String,
}

impl LLMService {
    pub fn new(options: LlmOptions) -> Result<Self> {
        let client = Client::builder().timeout(options.timeout).build()?;
        Ok(Self { client, options })
    }
}

#[async_trait]
impl TextGenerator for LLMService {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let full_prompt = format!("System: {}\nUser: {}\nAssistant:", SYSTEM_PROMPT, prompt);

        let request_body = CompletionRequest {
            prompt: full_prompt,
            stream: false, // One-shot only
            n_predict: self.options.n_predict,
            temperature: self.options.temperature,
            stop: vec!["User:".to_string(), "System:".to_string(), "\n".to_string()],
        };

        let response = self
            .client
            .post(format!("{}/completion", self.options.base_url.trim_end_matches('/')))
            .json(&request_body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::stage(
                SpeechStage::Generate,
                format!("LLM server error {}: {}", status, body),
            ));
        }

        let resp_json: CompletionResponse = response.json().await?;
        let text = resp_json.content.trim().to_string();
        debug!(chars = text.len(), "completion received");
        Ok(text)
    }
}
