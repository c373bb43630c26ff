#![allow(dead_code)]

use async_trait::async_trait;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use moodbot::outputs::{AngleSink, PatternSink, SpeechSink};
use moodbot::services::{SpeechSynthesizer, TextGenerator};
use moodbot::speech::player::AudioPlayer;
use moodbot::speech::pipeline::SpeechStage;
use moodbot::speech::SpeechCommand;
use moodbot::{Emotion, Error, Result};

// --- Actuator fakes ---

#[derive(Clone, Default)]
pub struct FakeEyebrow {
    pub sent: Arc<Mutex<Vec<u8>>>,
    pub broken: bool,
}

#[async_trait]
impl AngleSink for FakeEyebrow {
    async fn send_angle(&mut self, angle: u8) -> Result<()> {
        if self.broken {
            return Err(Error::ActuatorChannel {
                channel: moodbot::kernel::scheduler::Channel::Eyebrow,
                message: "serial unplugged".into(),
            });
        }
        self.sent.lock().unwrap().push(angle);
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct FakePattern {
    pub shown: Arc<Mutex<Vec<Emotion>>>,
    pub dead: bool,
    pub shutdowns: Arc<AtomicUsize>,
}

#[async_trait]
impl PatternSink for FakePattern {
    async fn show(&mut self, emotion: Emotion) -> Result<()> {
        if self.dead {
            return Err(Error::ProcessUnavailable("pattern".into()));
        }
        self.shown.lock().unwrap().push(emotion);
        Ok(())
    }

    async fn shutdown(&mut self, _grace: Duration) {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Clone, Default)]
pub struct FakeSpeech {
    pub submitted: Arc<Mutex<Vec<SpeechCommand>>>,
    pub shutdowns: Arc<AtomicUsize>,
}

#[async_trait]
impl SpeechSink for FakeSpeech {
    async fn submit(&mut self, command: SpeechCommand) -> Result<()> {
        self.submitted.lock().unwrap().push(command);
        Ok(())
    }

    async fn shutdown(&mut self, _grace: Duration) {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
    }
}

// --- Speech backend fakes ---

/// Returns "utterance N" for the N-th call (1-based) and records prompts.
#[derive(Default)]
pub struct ScriptedGenerator {
    pub prompts: Mutex<Vec<String>>,
    pub fail_first: usize,
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let mut prompts = self.prompts.lock().unwrap();
        prompts.push(prompt.to_string());
        let n = prompts.len();
        if n <= self.fail_first {
            return Err(Error::stage(SpeechStage::Generate, "backend unavailable"));
        }
        Ok(format!("utterance {}", n))
    }
}

/// Encodes the text itself as the "audio", failing the first `fail_first` calls.
#[derive(Default)]
pub struct FlakySynthesizer {
    pub calls: AtomicUsize,
    pub failures: AtomicUsize,
    pub fail_first: usize,
}

#[async_trait]
impl SpeechSynthesizer for FlakySynthesizer {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if n <= self.fail_first {
            self.failures.fetch_add(1, Ordering::SeqCst);
            return Err(Error::stage(SpeechStage::Synthesize, "quota exceeded"));
        }
        Ok(text.as_bytes().to_vec())
    }
}

/// Reads back what was "played", failing the first `fail_first` calls.
#[derive(Default)]
pub struct RecordingPlayer {
    pub played: Mutex<Vec<String>>,
    pub paths: Mutex<Vec<std::path::PathBuf>>,
    pub calls: AtomicUsize,
    pub fail_first: usize,
}

#[async_trait]
impl AudioPlayer for RecordingPlayer {
    async fn play(&self, path: &Path) -> Result<()> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.paths.lock().unwrap().push(path.to_path_buf());
        if n <= self.fail_first {
            return Err(Error::stage(SpeechStage::Play, "speaker disconnected"));
        }
        let bytes = std::fs::read(path)?;
        self.played
            .lock()
            .unwrap()
            .push(String::from_utf8_lossy(&bytes).into_owned());
        Ok(())
    }
}
