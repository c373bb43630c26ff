use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::time::Timestamp;
use crate::Error;

/// The closed set of labels the facial classifier can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    Neutral,
    Happy,
    Sad,
    Angry,
    Fear,
    Surprise,
    Disgust,
}

impl Emotion {
    pub const ALL: [Emotion; 7] = [
        Emotion::Neutral,
        Emotion::Happy,
        Emotion::Sad,
        Emotion::Angry,
        Emotion::Fear,
        Emotion::Surprise,
        Emotion::Disgust,
    ];

    /// Wire name used on the pattern and speech command channels.
    pub fn as_str(self) -> &'static str {
        match self {
            Emotion::Neutral => "neutral",
            Emotion::Happy => "happy",
            Emotion::Sad => "sad",
            Emotion::Angry => "angry",
            Emotion::Fear => "fear",
            Emotion::Surprise => "surprise",
            Emotion::Disgust => "disgust",
        }
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Emotion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        Emotion::ALL
            .into_iter()
            .find(|e| e.as_str().eq_ignore_ascii_case(name))
            .ok_or_else(|| Error::UnknownEmotion(name.to_string()))
    }
}

/// Result of one sampling window: either a label that won the vote,
/// or the fallback used when no frame was confident enough.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmotionLabel {
    Detected(Emotion),
    Fallback,
}

impl EmotionLabel {
    /// Fallback resolves to neutral.
    pub fn emotion(self) -> Emotion {
        match self {
            EmotionLabel::Detected(e) => e,
            EmotionLabel::Fallback => Emotion::Neutral,
        }
    }

    pub fn is_fallback(self) -> bool {
        matches!(self, EmotionLabel::Fallback)
    }
}

/// One aggregated reading per sampling window. Consumed by the debounce gate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EmotionSample {
    pub label: EmotionLabel,
    /// Mean confidence of the winning votes, 0.0 for the fallback.
    pub confidence: f32,
    pub timestamp: Timestamp,
}

impl EmotionSample {
    pub fn detected(emotion: Emotion, confidence: f32, timestamp: Timestamp) -> Self {
        Self {
            label: EmotionLabel::Detected(emotion),
            confidence,
            timestamp,
        }
    }

    pub fn fallback(timestamp: Timestamp) -> Self {
        Self {
            label: EmotionLabel::Fallback,
            confidence: 0.0,
            timestamp,
        }
    }
}
