//! Error types for the moodbot controller

use thiserror::Error;

use crate::kernel::emotion::Emotion;
use crate::kernel::scheduler::Channel;
use crate::speech::pipeline::SpeechStage;

/// Result type alias for moodbot operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the controller and its output channels
#[derive(Debug, Error)]
pub enum Error {
    /// Camera or classifier unavailable for a whole sampling window
    #[error("capture failure: {0}")]
    Capture(String),

    /// Serial write or process-pipe write failed
    #[error("{channel} channel failed: {message}")]
    ActuatorChannel { channel: Channel, message: String },

    /// One stage of the generate/synthesize/play sequence failed
    #[error("speech {stage} stage failed: {message}")]
    SpeechStage { stage: SpeechStage, message: String },

    /// Bounded speech retry policy ran out of attempts
    #[error("speech sequence abandoned after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: String },

    /// Child process exited before a write was attempted
    #[error("process '{0}' is not running")]
    ProcessUnavailable(String),

    /// Pipe to a child process is closed or the write failed
    #[error("broken channel to '{name}': {message}")]
    BrokenChannel { name: String, message: String },

    /// Label outside the closed emotion set
    #[error("unknown emotion: {0}")]
    UnknownEmotion(String),

    /// Emotion has no entry in the eyebrow angle table
    #[error("no eyebrow angle mapped for emotion '{0}'")]
    UnmappedEmotion(Emotion),

    /// Angle outside the servo range
    #[error("angle {0} outside 0..=180")]
    InvalidAngle(u16),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Serial port error
    #[error("serial error: {0}")]
    Serial(#[from] serialport::Error),

    /// Image decode/encode error
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
}

impl Error {
    /// Wrap any failure as a speech stage failure, keeping the stage that raised it
    pub fn stage(stage: SpeechStage, source: impl std::fmt::Display) -> Self {
        Self::SpeechStage {
            stage,
            message: source.to_string(),
        }
    }

    /// Wrap any failure as an actuator channel failure
    pub fn channel(channel: Channel, source: impl std::fmt::Display) -> Self {
        Self::ActuatorChannel {
            channel,
            message: source.to_string(),
        }
    }
}
