use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tracing::debug;

use super::pipeline::SpeechStage;
use crate::{Error, Result};

/// Playback capability. Resolves only once the file has finished playing.
#[async_trait]
pub trait AudioPlayer: Send + Sync {
    async fn play(&self, path: &Path) -> Result<()>;
}

/// Plays files through an external player binary, e.g. `mpg123 -q <file>`.
#[derive(Debug, Clone)]
pub struct CommandPlayer {
    program: String,
    args: Vec<String>,
}

impl CommandPlayer {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    pub fn mpg123() -> Self {
        Self::new("mpg123", vec!["-q".to_string()])
    }
}

#[async_trait]
impl AudioPlayer for CommandPlayer {
    async fn play(&self, path: &Path) -> Result<()> {
        debug!(player = %self.program, file = %path.display(), "starting playback");

        let status = tokio::process::Command::new(&self.program)
            .args(&self.args)
            .arg(path)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .status()
            .await
            .map_err(|e| Error::stage(SpeechStage::Play, format!("cannot run '{}': {}", self.program, e)))?;

        if !status.success() {
            return Err(Error::stage(
                SpeechStage::Play,
                format!("'{}' exited with {}", self.program, status),
            ));
        }
        Ok(())
    }
}
