use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::debounce::{DebounceGate, Decision};
use super::emotion::EmotionSample;
use crate::config::Config;
use crate::outputs::fanout::{ActuatorFanout, FanoutReport};
use crate::vision::pipeline::EmotionSampler;
use crate::{Error, Result};

#[derive(Debug, Clone, Copy)]
pub struct ReactorConfig {
    pub window: Duration,
    pub poll_interval: Duration,
    pub shutdown_grace: Duration,
}

impl ReactorConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            window: config.controller.window(),
            poll_interval: config.controller.poll_interval(),
            shutdown_grace: config.shutdown.grace(),
        }
    }
}

impl Default for ReactorConfig {
    fn default() -> Self {
        Self {
            window: Duration::from_secs(2),
            poll_interval: Duration::from_millis(100),
            shutdown_grace: Duration::from_secs(1),
        }
    }
}

/// The control loop: sample -> debounce -> fan out, one window at a time.
pub struct Reactor {
    sampler: Arc<Mutex<EmotionSampler>>,
    pub gate: DebounceGate,
    pub fanout: ActuatorFanout,
    config: ReactorConfig,
}

impl Reactor {
    pub fn new(
        sampler: EmotionSampler,
        gate: DebounceGate,
        fanout: ActuatorFanout,
        config: ReactorConfig,
    ) -> Self {
        Self {
            sampler: Arc::new(Mutex::new(sampler)),
            gate,
            fanout,
            config,
        }
    }

    /// Debounce one sample and dispatch whatever it decides.
    pub async fn step(&mut self, sample: &EmotionSample) -> (Decision, FanoutReport) {
        let decision = self.gate.observe_sample(sample);
        match decision {
            Decision::Changed { emotion, previous, initial } => {
                let from = previous.map_or("none", |p| p.as_str());
                info!(initial, "[EMOTION] {} -> {}", from, emotion);
            }
            Decision::Same(emotion) => debug!(%emotion, "emotion holding"),
            Decision::Suppressed => debug!(label = %sample.label.emotion(), "sample suppressed"),
        }

        let report = self.fanout.dispatch(&decision).await;
        (decision, report)
    }

    async fn sample_window(&self) -> Result<EmotionSample> {
        let sampler = Arc::clone(&self.sampler);
        let window = self.config.window;
        tokio::task::spawn_blocking(move || {
            let mut sampler = sampler
                .lock()
                .map_err(|_| Error::Capture("sampler poisoned by an earlier panic".into()))?;
            sampler.sample(window)
        })
        .await
        .map_err(|e| Error::Capture(format!("sampling thread failed: {}", e)))?
    }

    /// Runs until `shutdown` fires, then stops the child processes.
    pub async fn run(&mut self, shutdown: CancellationToken) {
        info!(
            window_ms = self.config.window.as_millis() as u64,
            poll_ms = self.config.poll_interval.as_millis() as u64,
            debounce_ms = self.gate.interval().as_millis() as u64,
            "Control loop started"
        );

        loop {
            let sample = tokio::select! {
                _ = shutdown.cancelled() => break,
                sample = self.sample_window() => sample,
            };

            match sample {
                Ok(sample) => {
                    let (_, report) = self.step(&sample).await;
                    if report.failures() > 0 {
                        debug!(?report, "partial actuation");
                    }
                }
                Err(e) => warn!(error = %e, "sampling failed; retrying next cycle"),
            }

            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(self.config.poll_interval) => {}
            }
        }

        info!("Control loop stopping");
        self.fanout.shutdown(self.config.shutdown_grace).await;
    }
}
