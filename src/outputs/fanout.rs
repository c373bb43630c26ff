use std::time::Duration;
use tracing::{error, warn};

use super::{AngleSink, PatternSink, SpeechSink};
use crate::kernel::debounce::Decision;
use crate::kernel::scheduler::{ActuatorCommand, AngleTable, Channel, Scheduler};
use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ChannelOutcome {
    Sent,
    #[default]
    Skipped,
    Failed(String),
}

impl ChannelOutcome {
    pub fn is_sent(&self) -> bool {
        matches!(self, ChannelOutcome::Sent)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, ChannelOutcome::Failed(_))
    }
}

/// What happened on each channel for one decision.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FanoutReport {
    pub eyebrow: ChannelOutcome,
    pub pattern: ChannelOutcome,
    pub speech: ChannelOutcome,
}

impl FanoutReport {
    pub fn outcome(&self, channel: Channel) -> &ChannelOutcome {
        match channel {
            Channel::Eyebrow => &self.eyebrow,
            Channel::Pattern => &self.pattern,
            Channel::Speech => &self.speech,
        }
    }

    pub fn failures(&self) -> usize {
        [&self.eyebrow, &self.pattern, &self.speech]
            .into_iter()
            .filter(|o| o.is_failed())
            .count()
    }

    fn record(&mut self, channel: Channel, outcome: ChannelOutcome) {
        match channel {
            Channel::Eyebrow => self.eyebrow = outcome,
            Channel::Pattern => self.pattern = outcome,
            Channel::Speech => self.speech = outcome,
        }
    }
}

/// Best-effort, at-most-once delivery of each accepted decision to every
/// channel. A failing channel is logged and never blocks its siblings.
pub struct ActuatorFanout {
    angles: AngleTable,
    eyebrow: Box<dyn AngleSink>,
    pattern: Box<dyn PatternSink>,
    speech: Box<dyn SpeechSink>,
    emit_repeats: bool,
}

impl ActuatorFanout {
    pub fn new(
        angles: AngleTable,
        eyebrow: Box<dyn AngleSink>,
        pattern: Box<dyn PatternSink>,
        speech: Box<dyn SpeechSink>,
    ) -> Self {
        Self {
            angles,
            eyebrow,
            pattern,
            speech,
            emit_repeats: true,
        }
    }

    /// When false, `Same` decisions are not forwarded to speech.
    pub fn with_repeats(mut self, emit_repeats: bool) -> Self {
        self.emit_repeats = emit_repeats;
        self
    }

    pub fn angles(&self) -> &AngleTable {
        &self.angles
    }

    pub async fn dispatch(&mut self, decision: &Decision) -> FanoutReport {
        let mut report = FanoutReport::default();
        if matches!(decision, Decision::Same(_)) && !self.emit_repeats {
            return report;
        }

        for planned in Scheduler::plan(decision, &self.angles) {
            let result = match planned.command {
                Ok(command) => self.send(command).await,
                Err(e) => Err(e),
            };

            let outcome = match result {
                Ok(()) => ChannelOutcome::Sent,
                Err(e) => {
                    match &e {
                        Error::UnmappedEmotion(_) | Error::InvalidAngle(_) => {
                            error!(channel = %planned.channel, error = %e, "rejected actuation")
                        }
                        _ => warn!(channel = %planned.channel, error = %e, "actuation failed; continuing"),
                    }
                    ChannelOutcome::Failed(e.to_string())
                }
            };
            report.record(planned.channel, outcome);
        }
        report
    }

    async fn send(&mut self, command: ActuatorCommand) -> Result<()> {
        match command {
            ActuatorCommand::Eyebrow { angle } => self.eyebrow.send_angle(angle).await,
            ActuatorCommand::Pattern { emotion } => self.pattern.show(emotion).await,
            ActuatorCommand::Speech(command) => self.speech.submit(command).await,
        }
    }

    /// Stop both child-backed channels and release the serial port.
    pub async fn shutdown(&mut self, grace: Duration) {
        self.pattern.shutdown(grace).await;
        self.speech.shutdown(grace).await;
        self.eyebrow.close().await;
    }
}
