use serde::Deserialize;
use std::io::Cursor;
use std::time::Duration;
use tokio::runtime::Handle;

use super::frame::Frame;
use crate::kernel::emotion::Emotion;
use crate::{Error, Result};

/// Top prediction for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    pub emotion: Emotion,
    pub confidence: f32,
}

/// Facial-emotion classifier capability.
/// `Ok(None)` means the frame contained no usable face.
pub trait EmotionClassifier: Send {
    fn classify(&mut self, frame: &Frame) -> Result<Option<Classification>>;
}

#[derive(Deserialize)]
struct ClassifierResponse {
    label: Option<String>,
    #[serde(default)]
    confidence: f32,
}

/// Posts PNG frames to an inference server answering `{"label", "confidence"}`.
///
/// Runs on the sampling thread and drives the async client through the
/// runtime handle it was built with.
pub struct HttpClassifier {
    client: reqwest::Client,
    url: String,
    runtime: Handle,
}

impl HttpClassifier {
    pub fn new(url: impl Into<String>, timeout: Duration, runtime: Handle) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
            runtime,
        })
    }
}

impl EmotionClassifier for HttpClassifier {
    fn classify(&mut self, frame: &Frame) -> Result<Option<Classification>> {
        let mut png = Cursor::new(Vec::new());
        frame.write_to(&mut png, image::ImageOutputFormat::Png)?;
        let body = png.into_inner();

        let body = self.runtime.block_on(async {
            let response = self
                .client
                .post(&self.url)
                .header("Content-Type", "image/png")
                .body(body)
                .send()
                .await?
                .error_for_status()?;
            response.bytes().await
        })?;

        parse_classification(&body)
    }
}

/// Decode a classifier reply. A missing or null `label` means no face.
pub fn parse_classification(body: &[u8]) -> Result<Option<Classification>> {
    let response: ClassifierResponse = serde_json::from_slice(body)?;
    match response.label {
        None => Ok(None),
        Some(label) => Ok(Some(Classification {
            emotion: label.parse()?,
            confidence: response.confidence,
        })),
    }
}
