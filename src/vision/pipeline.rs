use std::time::{Duration, Instant};
use tracing::{debug, info};

use super::classifier::{Classification, EmotionClassifier};
use super::frame::FrameSource;
use crate::kernel::emotion::{Emotion, EmotionSample};
use crate::kernel::time::MonotonicClock;
use crate::{Error, Result};

pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.4;

#[derive(Debug, Clone, Copy)]
pub struct SamplerOptions {
    /// A frame votes only if its top confidence is strictly above this.
    pub confidence_threshold: f32,
    /// This many failed frames in a row abort the window.
    pub max_consecutive_failures: u32,
}

impl Default for SamplerOptions {
    fn default() -> Self {
        Self {
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            max_consecutive_failures: 5,
        }
    }
}

/// Turns a stream of per-frame predictions into one label per window by
/// majority vote.
///
/// Blocking: meant to run on a dedicated thread (`spawn_blocking`), never
/// on the async workers.
pub struct EmotionSampler {
    source: Box<dyn FrameSource>,
    classifier: Box<dyn EmotionClassifier>,
    clock: MonotonicClock,
    options: SamplerOptions,
}

impl EmotionSampler {
    pub fn new(
        source: Box<dyn FrameSource>,
        classifier: Box<dyn EmotionClassifier>,
        clock: MonotonicClock,
        options: SamplerOptions,
    ) -> Self {
        Self {
            source,
            classifier,
            clock,
            options,
        }
    }

    /// One window. Returns the majority label, or the neutral fallback if no
    /// frame was confident enough. Individual frame failures are skipped;
    /// a run of them, or a window with no successful frame at all, is a
    /// `Capture` error for the caller to retry next cycle.
    pub fn sample(&mut self, window: Duration) -> Result<EmotionSample> {
        let started = Instant::now();
        let mut tally = Tally::default();
        let mut frames = 0u32;
        let mut failed = 0u32;
        let mut consecutive_failures = 0u32;
        let mut last_error = None;

        while started.elapsed() < window {
            match self.next_prediction() {
                Ok(prediction) => {
                    frames += 1;
                    consecutive_failures = 0;
                    if let Some(c) = prediction {
                        if c.confidence > self.options.confidence_threshold {
                            tally.vote(c);
                        }
                    }
                }
                Err(e) => {
                    failed += 1;
                    consecutive_failures += 1;
                    debug!(error = %e, consecutive_failures, "frame skipped");
                    if consecutive_failures >= self.options.max_consecutive_failures {
                        return Err(Error::Capture(format!(
                            "{} consecutive frame failures, last: {}",
                            consecutive_failures, e
                        )));
                    }
                    last_error = Some(e);
                }
            }
        }

        if frames == 0 {
            if let Some(e) = last_error {
                return Err(Error::Capture(format!("no frame captured in window, last: {}", e)));
            }
        }

        let timestamp = self.clock.now();
        let sample = match tally.winner() {
            Some((emotion, confidence)) => EmotionSample::detected(emotion, confidence, timestamp),
            None => EmotionSample::fallback(timestamp),
        };
        info!(
            label = %sample.label.emotion(),
            fallback = sample.label.is_fallback(),
            votes = tally.total(),
            frames,
            failed,
            "sampling window closed"
        );
        Ok(sample)
    }

    fn next_prediction(&mut self) -> Result<Option<Classification>> {
        let frame = self.source.capture()?;
        self.classifier.classify(&frame)
    }
}

/// Vote counts in first-seen order.
#[derive(Debug, Default)]
struct Tally {
    entries: Vec<(Emotion, u32, f32)>,
}

impl Tally {
    fn vote(&mut self, c: Classification) {
        match self.entries.iter_mut().find(|(e, _, _)| *e == c.emotion) {
            Some((_, count, sum)) => {
                *count += 1;
                *sum += c.confidence;
            }
            None => self.entries.push((c.emotion, 1, c.confidence)),
        }
    }

    fn total(&self) -> u32 {
        self.entries.iter().map(|(_, count, _)| count).sum()
    }

    /// Highest count wins; ties go to the label seen first in the window.
    /// Returns the winner with its mean confidence.
    fn winner(&self) -> Option<(Emotion, f32)> {
        let mut best: Option<&(Emotion, u32, f32)> = None;
        for entry in &self.entries {
            if best.map_or(true, |b| entry.1 > b.1) {
                best = Some(entry);
            }
        }
        best.map(|(emotion, count, sum)| (*emotion, sum / *count as f32))
    }
}
