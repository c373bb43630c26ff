//! Configuration for the controller and the speech unit
//!
//! Everything has a default matching the deployed robot, so an empty
//! (or absent) TOML file is a valid configuration.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::kernel::debounce::RepeatPolicy;
use crate::kernel::emotion::Emotion;
use crate::kernel::scheduler::{AngleTable, EyebrowProfile, MAX_ANGLE};
use crate::outputs::eyebrow::{DEFAULT_SERIAL_BAUD, DEFAULT_SERIAL_PORT};
use crate::speech::pipeline::{PipelineOptions, RetryPolicy};
use crate::vision::pipeline::{SamplerOptions, DEFAULT_CONFIDENCE_THRESHOLD};
use crate::{Error, Result};

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub controller: ControllerConfig,
    pub vision: VisionConfig,
    pub eyebrow: EyebrowConfig,
    pub pattern: PatternConfig,
    pub speech: SpeechConfig,
    pub shutdown: ShutdownConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ControllerConfig {
    pub debounce_interval_ms: u64,
    pub poll_interval_ms: u64,
    pub window_ms: u64,
    pub confidence_threshold: f32,
    pub max_consecutive_capture_failures: u32,
    pub repeat_policy: RepeatPolicy,
    /// Forward `SAME` decisions to the speech unit.
    pub emit_repeats: bool,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            debounce_interval_ms: 300,
            poll_interval_ms: 100,
            window_ms: 2000,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            max_consecutive_capture_failures: 5,
            repeat_policy: RepeatPolicy::Hold,
            emit_repeats: true,
        }
    }
}

impl ControllerConfig {
    pub fn debounce_interval(&self) -> Duration {
        Duration::from_millis(self.debounce_interval_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }

    pub fn sampler_options(&self) -> SamplerOptions {
        SamplerOptions {
            confidence_threshold: self.confidence_threshold,
            max_consecutive_failures: self.max_consecutive_capture_failures,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VisionConfig {
    /// Image file the camera daemon refreshes.
    pub snapshot_path: PathBuf,
    pub classifier_url: String,
    pub classifier_timeout_ms: u64,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            snapshot_path: PathBuf::from("/dev/shm/moodbot_frame.jpg"),
            classifier_url: "http://localhost:8090/classify".to_string(),
            classifier_timeout_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EyebrowConfig {
    pub port: String,
    pub baud: u32,
    pub timeout_ms: u64,
    pub profile: EyebrowProfile,
    /// Per-emotion angle overrides on top of the profile.
    pub overrides: BTreeMap<Emotion, u16>,
}

impl Default for EyebrowConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_SERIAL_PORT.to_string(),
            baud: DEFAULT_SERIAL_BAUD,
            timeout_ms: 100,
            profile: EyebrowProfile::Primary,
            overrides: BTreeMap::new(),
        }
    }
}

impl EyebrowConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn angle_table(&self) -> Result<AngleTable> {
        self.overrides
            .iter()
            .try_fold(AngleTable::for_profile(self.profile), |table, (emotion, angle)| {
                table.with_override(*emotion, *angle)
            })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PatternConfig {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl Default for PatternConfig {
    fn default() -> Self {
        Self {
            program: PathBuf::from("./mouthLED.exe"),
            args: Vec::new(),
        }
    }
}

/// Where the speech unit runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeechMode {
    /// `moodbot speak` child process fed over stdin.
    #[default]
    Process,
    /// Tokio task inside the controller.
    Task,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SpeechConfig {
    pub mode: SpeechMode,
    pub llm_url: String,
    pub n_predict: usize,
    pub temperature: f32,
    pub tts_url: String,
    pub tts_api_key: Option<String>,
    pub tts_model: String,
    pub tts_voice: String,
    pub tts_speed: f32,
    pub request_timeout_ms: u64,
    /// Reply language appended to every prompt, e.g. "Korean".
    pub language: Option<String>,
    pub player: String,
    pub player_args: Vec<String>,
    pub audio_dir: PathBuf,
    pub retry_backoff_ms: u64,
    /// Unset retries forever.
    pub max_attempts: Option<u32>,
    pub drain_on_retry: bool,
    /// Pending commands buffered in task mode.
    pub queue_capacity: usize,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            mode: SpeechMode::Process,
            llm_url: "http://localhost:8080".to_string(),
            n_predict: 64,
            temperature: 0.8,
            tts_url: "https://api.openai.com".to_string(),
            tts_api_key: None,
            tts_model: "tts-1".to_string(),
            tts_voice: "alloy".to_string(),
            tts_speed: 1.0,
            request_timeout_ms: 20_000,
            language: None,
            player: "mpg123".to_string(),
            player_args: vec!["-q".to_string()],
            audio_dir: std::env::temp_dir().join("moodbot"),
            retry_backoff_ms: 2000,
            max_attempts: None,
            drain_on_retry: true,
            queue_capacity: 16,
        }
    }
}

impl SpeechConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        let backoff = Duration::from_millis(self.retry_backoff_ms);
        match self.max_attempts {
            Some(max) => RetryPolicy::bounded(backoff, max),
            None => RetryPolicy::unbounded(backoff),
        }
    }

    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            audio_dir: self.audio_dir.clone(),
            audio_extension: "mp3".to_string(),
            retry: self.retry_policy(),
            drain_on_retry: self.drain_on_retry,
            language: self.language.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ShutdownConfig {
    pub grace_ms: u64,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self { grace_ms: 1000 }
    }
}

impl ShutdownConfig {
    pub fn grace(&self) -> Duration {
        Duration::from_millis(self.grace_ms)
    }
}

impl Config {
    /// Load from a TOML file, or defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path).map_err(|e| {
                    Error::Config(format!("cannot read {}: {}", path.display(), e))
                })?;
                Self::from_toml(&text)?
            }
            None => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn validate(&self) -> Result<()> {
        let c = &self.controller;
        if c.debounce_interval_ms == 0 {
            return Err(Error::Config("controller.debounce_interval_ms must be > 0".into()));
        }
        if c.poll_interval_ms == 0 || c.window_ms == 0 {
            return Err(Error::Config("controller poll and window intervals must be > 0".into()));
        }
        if !(0.0..=1.0).contains(&c.confidence_threshold) {
            return Err(Error::Config(format!(
                "controller.confidence_threshold {} outside [0, 1]",
                c.confidence_threshold
            )));
        }
        if c.max_consecutive_capture_failures == 0 {
            return Err(Error::Config(
                "controller.max_consecutive_capture_failures must be > 0".into(),
            ));
        }
        if let Some((emotion, angle)) = self
            .eyebrow
            .overrides
            .iter()
            .find(|(_, angle)| **angle > u16::from(MAX_ANGLE))
        {
            return Err(Error::Config(format!(
                "eyebrow.overrides.{} = {} outside 0..=180",
                emotion, angle
            )));
        }
        if self.speech.max_attempts == Some(0) {
            return Err(Error::Config("speech.max_attempts must be > 0 when set".into()));
        }
        Ok(())
    }
}
