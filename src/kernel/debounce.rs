use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::emotion::{Emotion, EmotionSample};
use super::time::Timestamp;

pub const DEFAULT_DEBOUNCE_INTERVAL: Duration = Duration::from_millis(300);

/// How a repeated reading of the held emotion is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepeatPolicy {
    /// Repeats leave `last_change` untouched.
    #[default]
    Hold,
    /// Repeats refresh `last_change`, so at most one SAME per interval.
    Heartbeat,
}

/// Outcome of feeding one sample to the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// A new emotion was accepted. `initial` is set only for the very
    /// first stabilization after boot.
    Changed {
        emotion: Emotion,
        previous: Option<Emotion>,
        initial: bool,
    },
    /// The held emotion was observed again outside the debounce window.
    Same(Emotion),
    /// Too soon after the last change. Nothing was mutated.
    Suppressed,
}

impl Decision {
    pub fn emotion(&self) -> Option<Emotion> {
        match self {
            Decision::Changed { emotion, .. } | Decision::Same(emotion) => Some(*emotion),
            Decision::Suppressed => None,
        }
    }

    pub fn is_initial(&self) -> bool {
        matches!(self, Decision::Changed { initial: true, .. })
    }
}

/// Held state. Only the gate mutates it, and only on accepted decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DebounceState {
    current: Option<Emotion>,
    last_change: Timestamp,
    initialized: bool,
}

impl DebounceState {
    pub fn current(&self) -> Option<Emotion> {
        self.current
    }

    pub fn last_change(&self) -> Timestamp {
        self.last_change
    }

    pub fn initialized(&self) -> bool {
        self.initialized
    }
}

/// Debounce state machine: NO_SIGNAL until the first sample, then STABLE(e).
///
/// For a sample `s` at `t` once stable:
/// - `t - last_change <= interval` suppresses, whatever `s` is
/// - a different `s` becomes the new state (`Changed`)
/// - the same `s` yields `Same`
#[derive(Debug, Clone)]
pub struct DebounceGate {
    state: DebounceState,
    interval: Duration,
    repeat_policy: RepeatPolicy,
}

impl DebounceGate {
    pub fn new(interval: Duration) -> Self {
        Self {
            state: DebounceState::default(),
            interval,
            repeat_policy: RepeatPolicy::Hold,
        }
    }

    pub fn with_repeat_policy(mut self, policy: RepeatPolicy) -> Self {
        self.repeat_policy = policy;
        self
    }

    pub fn state(&self) -> &DebounceState {
        &self.state
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// True until the first decision has been made.
    pub fn is_initial_run(&self) -> bool {
        !self.state.initialized
    }

    pub fn observe_sample(&mut self, sample: &EmotionSample) -> Decision {
        self.observe(sample.label.emotion(), sample.timestamp)
    }

    pub fn observe(&mut self, emotion: Emotion, at: Timestamp) -> Decision {
        let Some(current) = self.state.current else {
            // First observation stabilizes unconditionally.
            self.state = DebounceState {
                current: Some(emotion),
                last_change: at,
                initialized: true,
            };
            return Decision::Changed {
                emotion,
                previous: None,
                initial: true,
            };
        };

        if at.elapsed_since(self.state.last_change) <= self.interval {
            return Decision::Suppressed;
        }

        if emotion != current {
            self.state.current = Some(emotion);
            self.state.last_change = at;
            return Decision::Changed {
                emotion,
                previous: Some(current),
                initial: false,
            };
        }

        if self.repeat_policy == RepeatPolicy::Heartbeat {
            self.state.last_change = at;
        }
        Decision::Same(emotion)
    }
}

impl Default for DebounceGate {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE_INTERVAL)
    }
}
