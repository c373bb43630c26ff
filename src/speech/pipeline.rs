use std::collections::VecDeque;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::command::SpeechCommand;
use super::conversation::ConversationState;
use super::player::{AudioPlayer, CommandPlayer};
use super::prompt::{build_prompt, PromptRequest};
use crate::config::SpeechConfig;
use crate::kernel::emotion::Emotion;
use crate::services::llm::{LLMService, LlmOptions};
use crate::services::tts::{HttpSynthesizer, TtsOptions};
use crate::services::{SpeechSynthesizer, TextGenerator};
use crate::{Error, Result};

pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeechStage {
    Generate,
    Synthesize,
    Play,
}

impl fmt::Display for SpeechStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SpeechStage::Generate => "generate",
            SpeechStage::Synthesize => "synthesize",
            SpeechStage::Play => "play",
        })
    }
}

/// How often the whole generate/synthesize/play sequence is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub backoff: Duration,
    /// `None` retries until an attempt succeeds.
    pub max_attempts: Option<u32>,
}

impl RetryPolicy {
    pub fn unbounded(backoff: Duration) -> Self {
        Self { backoff, max_attempts: None }
    }

    pub fn bounded(backoff: Duration, max_attempts: u32) -> Self {
        Self {
            backoff,
            max_attempts: Some(max_attempts.max(1)),
        }
    }

    fn allows_another(&self, attempts_so_far: u32) -> bool {
        self.max_attempts.map_or(true, |max| attempts_so_far < max)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::unbounded(DEFAULT_RETRY_BACKOFF)
    }
}

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Where synthesized audio is written before playback.
    pub audio_dir: PathBuf,
    pub audio_extension: String,
    pub retry: RetryPolicy,
    /// Purge leftovers of a failed attempt before the next one starts.
    /// When off, text whose synthesis failed is spoken by the next attempt
    /// ahead of the freshly generated text.
    pub drain_on_retry: bool,
    pub language: Option<String>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            audio_dir: std::env::temp_dir(),
            audio_extension: "mp3".to_string(),
            retry: RetryPolicy::default(),
            drain_on_retry: true,
            language: None,
        }
    }
}

/// Text waiting for synthesis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingText {
    pub text: String,
}

/// Synthesized audio waiting for playback, with the text it speaks.
#[derive(Debug)]
pub struct PendingAudio {
    pub file: AudioFile,
    pub text: String,
}

/// An audio file owned by the pipeline. Removed from disk when dropped, so
/// an interrupted playback never leaves it behind.
#[derive(Debug)]
pub struct AudioFile {
    path: PathBuf,
}

impl AudioFile {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for AudioFile {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(file = %self.path.display(), error = %e, "could not clean up audio file");
            }
        }
    }
}

/// generate -> synthesize -> play, retried as one unit.
///
/// Runs on a single task: at most one `speak` is in flight, so the two
/// queues are single-producer/single-consumer and `conversation` has one writer.
pub struct SpeechPipeline {
    generator: Arc<dyn TextGenerator>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    player: Arc<dyn AudioPlayer>,
    pending_text: VecDeque<PendingText>,
    pending_audio: VecDeque<PendingAudio>,
    conversation: ConversationState,
    options: PipelineOptions,
    run_id: String,
    file_counter: u64,
}

impl SpeechPipeline {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        player: Arc<dyn AudioPlayer>,
        options: PipelineOptions,
    ) -> Self {
        Self {
            generator,
            synthesizer,
            player,
            pending_text: VecDeque::new(),
            pending_audio: VecDeque::new(),
            conversation: ConversationState::default(),
            options,
            run_id: Uuid::new_v4().simple().to_string()[..8].to_string(),
            file_counter: 0,
        }
    }

    /// Wire the HTTP backends and the external player from configuration.
    pub fn from_config(config: &SpeechConfig) -> Result<Self> {
        let generator = LLMService::new(LlmOptions {
            base_url: config.llm_url.clone(),
            n_predict: config.n_predict,
            temperature: config.temperature,
            timeout: Duration::from_millis(config.request_timeout_ms),
        })?;
        let synthesizer = HttpSynthesizer::new(TtsOptions {
            base_url: config.tts_url.clone(),
            api_key: config.tts_api_key.clone(),
            model: config.tts_model.clone(),
            voice: config.tts_voice.clone(),
            speed: config.tts_speed,
            timeout: Duration::from_millis(config.request_timeout_ms),
        })?;
        let player = CommandPlayer::new(config.player.clone(), config.player_args.clone());

        std::fs::create_dir_all(&config.audio_dir)?;

        Ok(Self::new(
            Arc::new(generator),
            Arc::new(synthesizer),
            Arc::new(player),
            config.pipeline_options(),
        ))
    }

    pub fn conversation(&self) -> &ConversationState {
        &self.conversation
    }

    pub fn pending_text(&self) -> usize {
        self.pending_text.len()
    }

    pub fn pending_audio(&self) -> usize {
        self.pending_audio.len()
    }

    pub async fn handle(&mut self, command: SpeechCommand) -> Result<String> {
        match command {
            SpeechCommand::Change(emotion) => self.speak_emotion_changed(emotion).await,
            SpeechCommand::Same => self.speak_continuation().await,
        }
    }

    pub async fn speak_emotion_changed(&mut self, emotion: Emotion) -> Result<String> {
        let prompt = build_prompt(
            &self.conversation,
            PromptRequest::EmotionChanged(emotion),
            self.options.language.as_deref(),
        );
        self.speak(&prompt).await
    }

    pub async fn speak_continuation(&mut self) -> Result<String> {
        let prompt = build_prompt(
            &self.conversation,
            PromptRequest::Continuation,
            self.options.language.as_deref(),
        );
        self.speak(&prompt).await
    }

    /// Runs the full sequence until one attempt succeeds (or the retry
    /// policy gives up). Returns the utterance that was played.
    pub async fn speak(&mut self, prompt: &str) -> Result<String> {
        debug!(prompt, "speak requested");
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            if attempts > 1 && self.options.drain_on_retry {
                self.drain_stale();
            }

            match self.attempt(prompt).await {
                Ok(spoken) => {
                    self.conversation.commit(&spoken);
                    info!(attempts, utterance = %spoken, "speech sequence completed");
                    return Ok(spoken);
                }
                Err(e) => {
                    if !self.options.retry.allows_another(attempts) {
                        error!(attempts, error = %e, "speech sequence failed; giving up");
                        return Err(Error::RetriesExhausted {
                            attempts,
                            last: e.to_string(),
                        });
                    }
                    warn!(
                        attempts,
                        error = %e,
                        backoff_ms = self.options.retry.backoff.as_millis() as u64,
                        "speech sequence failed; retrying from generation"
                    );
                    tokio::time::sleep(self.options.retry.backoff).await;
                }
            }
        }
    }

    async fn attempt(&mut self, prompt: &str) -> Result<String> {
        self.generate(prompt).await?;
        self.synthesize().await?;
        self.play().await
    }

    async fn generate(&mut self, prompt: &str) -> Result<()> {
        let text = self
            .generator
            .generate(prompt)
            .await
            .map_err(|e| stage_error(SpeechStage::Generate, e))?;
        let text = text.trim();
        if text.is_empty() {
            return Err(Error::stage(SpeechStage::Generate, "empty completion"));
        }
        debug!(utterance = text, "generated");
        self.pending_text.push_back(PendingText { text: text.to_string() });
        Ok(())
    }

    /// The text stays queued until its audio is saved.
    async fn synthesize(&mut self) -> Result<()> {
        let text = self
            .pending_text
            .front()
            .map(|pending| pending.text.clone())
            .ok_or_else(|| Error::stage(SpeechStage::Synthesize, "no pending text"))?;

        let audio = self
            .synthesizer
            .synthesize(&text)
            .await
            .map_err(|e| stage_error(SpeechStage::Synthesize, e))?;

        let file = AudioFile { path: self.next_audio_path() };
        tokio::fs::write(file.path(), &audio).await.map_err(|e| {
            Error::stage(
                SpeechStage::Synthesize,
                format!("cannot write {}: {}", file.path().display(), e),
            )
        })?;
        debug!(file = %file.path().display(), bytes = audio.len(), "audio saved");

        self.pending_text.pop_front();
        self.pending_audio.push_back(PendingAudio { file, text });
        Ok(())
    }

    async fn play(&mut self) -> Result<String> {
        let pending = self
            .pending_audio
            .pop_front()
            .ok_or_else(|| Error::stage(SpeechStage::Play, "no pending audio"))?;

        // `pending` owns the file: it is removed here or when this future is dropped.
        self.player
            .play(pending.file.path())
            .await
            .map_err(|e| stage_error(SpeechStage::Play, e))?;
        Ok(pending.text)
    }

    /// Text whose synthesis failed is superseded by the retry's fresh text.
    fn drain_stale(&mut self) {
        let stale_text = self.pending_text.len();
        let stale_audio = self.pending_audio.len();
        self.pending_text.clear();
        self.pending_audio.clear();
        if stale_text + stale_audio > 0 {
            debug!(stale_text, stale_audio, "drained stale speech items before retry");
        }
    }

    fn next_audio_path(&mut self) -> PathBuf {
        let name = format!(
            "moodbot_{}_{}.{}",
            self.run_id, self.file_counter, self.options.audio_extension
        );
        self.file_counter += 1;
        self.options.audio_dir.join(name)
    }
}

fn stage_error(stage: SpeechStage, e: Error) -> Error {
    match e {
        Error::SpeechStage { .. } => e,
        other => Error::stage(stage, other),
    }
}
