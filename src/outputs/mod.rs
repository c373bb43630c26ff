//! Actuation channels and the fan-out that drives them.

pub mod eyebrow;
pub mod fanout;
pub mod pattern;
pub mod speech;

use async_trait::async_trait;
use std::time::Duration;

use crate::kernel::emotion::Emotion;
use crate::speech::command::SpeechCommand;
use crate::Result;

pub use eyebrow::SerialEyebrow;
pub use fanout::{ActuatorFanout, ChannelOutcome, FanoutReport};
pub use pattern::PatternProcess;
pub use speech::{ChannelSpeechSink, ProcessSpeechSink};

/// Mechanical eyebrow servo.
#[async_trait]
pub trait AngleSink: Send {
    async fn send_angle(&mut self, angle: u8) -> Result<()>;

    async fn close(&mut self) {}
}

/// Pattern-rendering display (mouth LEDs).
#[async_trait]
pub trait PatternSink: Send {
    async fn show(&mut self, emotion: Emotion) -> Result<()>;

    async fn shutdown(&mut self, _grace: Duration) {}
}

/// Command channel into the speech unit. Must not wait for speech to finish.
#[async_trait]
pub trait SpeechSink: Send {
    async fn submit(&mut self, command: SpeechCommand) -> Result<()>;

    async fn shutdown(&mut self, _grace: Duration) {}
}
