use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::debounce::Decision;
use super::emotion::Emotion;
use crate::speech::command::SpeechCommand;
use crate::{Error, Result};

pub const MAX_ANGLE: u8 = 180;

/// Independent output paths driven by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Eyebrow,
    Pattern,
    Speech,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Channel::Eyebrow => "eyebrow",
            Channel::Pattern => "pattern",
            Channel::Speech => "speech",
        })
    }
}

/// A single send on one channel. Built per accepted decision and consumed immediately.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActuatorCommand {
    Eyebrow { angle: u8 },
    Pattern { emotion: Emotion },
    Speech(SpeechCommand),
}

impl ActuatorCommand {
    pub fn channel(&self) -> Channel {
        match self {
            ActuatorCommand::Eyebrow { .. } => Channel::Eyebrow,
            ActuatorCommand::Pattern { .. } => Channel::Pattern,
            ActuatorCommand::Speech(_) => Channel::Speech,
        }
    }
}

/// The two eyebrow tables seen in deployed robots. They disagree on
/// `angry` and `surprise` only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EyebrowProfile {
    /// angry=40, surprise=160
    #[default]
    Primary,
    /// angry=160, surprise=20
    Alternate,
}

/// Emotion -> servo angle. Also the source of truth for which emotions
/// the eyebrow channel accepts: a missing entry is an error, never a default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AngleTable {
    angles: BTreeMap<Emotion, u8>,
}

impl AngleTable {
    pub fn for_profile(profile: EyebrowProfile) -> Self {
        let (angry, surprise) = match profile {
            EyebrowProfile::Primary => (40, 160),
            EyebrowProfile::Alternate => (160, 20),
        };
        let angles = BTreeMap::from([
            (Emotion::Neutral, 90),
            (Emotion::Happy, 120),
            (Emotion::Sad, 60),
            (Emotion::Angry, angry),
            (Emotion::Fear, 130),
            (Emotion::Surprise, surprise),
            (Emotion::Disgust, 70),
        ]);
        Self { angles }
    }

    /// Build a custom table. Emotions left out are rejected at dispatch time.
    pub fn from_entries<I>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (Emotion, u16)>,
    {
        let mut angles = BTreeMap::new();
        for (emotion, angle) in entries {
            angles.insert(emotion, checked_angle(angle)?);
        }
        Ok(Self { angles })
    }

    pub fn with_override(mut self, emotion: Emotion, angle: u16) -> Result<Self> {
        self.angles.insert(emotion, checked_angle(angle)?);
        Ok(self)
    }

    pub fn angle_for(&self, emotion: Emotion) -> Result<u8> {
        self.angles
            .get(&emotion)
            .copied()
            .ok_or(Error::UnmappedEmotion(emotion))
    }

    /// Lookup by raw label, e.g. from a command line.
    pub fn angle_for_name(&self, name: &str) -> Result<u8> {
        self.angle_for(name.parse()?)
    }

    pub fn len(&self) -> usize {
        self.angles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.angles.is_empty()
    }
}

impl Default for AngleTable {
    fn default() -> Self {
        Self::for_profile(EyebrowProfile::Primary)
    }
}

fn checked_angle(angle: u16) -> Result<u8> {
    u8::try_from(angle)
        .ok()
        .filter(|a| *a <= MAX_ANGLE)
        .ok_or(Error::InvalidAngle(angle))
}

/// A command destined for one channel, or the reason it could not be built.
#[derive(Debug)]
pub struct PlannedCommand {
    pub channel: Channel,
    pub command: Result<ActuatorCommand>,
}

pub struct Scheduler;

impl Scheduler {
    /// Pure projection: Decision -> per-channel commands, in send order.
    pub fn plan(decision: &Decision, angles: &AngleTable) -> Vec<PlannedCommand> {
        match *decision {
            Decision::Changed { emotion, .. } => vec![
                PlannedCommand {
                    channel: Channel::Eyebrow,
                    command: angles
                        .angle_for(emotion)
                        .map(|angle| ActuatorCommand::Eyebrow { angle }),
                },
                PlannedCommand {
                    channel: Channel::Pattern,
                    command: Ok(ActuatorCommand::Pattern { emotion }),
                },
                PlannedCommand {
                    channel: Channel::Speech,
                    command: Ok(ActuatorCommand::Speech(SpeechCommand::Change(emotion))),
                },
            ],
            // Repeats only keep the conversation going; no redundant hardware writes.
            Decision::Same(_) => vec![PlannedCommand {
                channel: Channel::Speech,
                command: Ok(ActuatorCommand::Speech(SpeechCommand::Same)),
            }],
            Decision::Suppressed => Vec::new(),
        }
    }
}
