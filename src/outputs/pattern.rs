use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

use super::PatternSink;
use crate::kernel::emotion::Emotion;
use crate::kernel::scheduler::Channel;
use crate::process::supervisor::{LineChannel, ProcessHandle};
use crate::{Error, Result};

/// Pattern renderer driven by one emotion name per line.
pub struct PatternProcess<C: LineChannel = ProcessHandle> {
    channel: C,
}

impl<C: LineChannel> PatternProcess<C> {
    pub fn new(channel: C) -> Self {
        Self { channel }
    }

    pub fn channel_mut(&mut self) -> &mut C {
        &mut self.channel
    }
}

#[async_trait]
impl<C: LineChannel> PatternSink for PatternProcess<C> {
    async fn show(&mut self, emotion: Emotion) -> Result<()> {
        if !self.channel.is_alive() {
            return Err(Error::ProcessUnavailable(self.channel.name().to_string()));
        }
        self.channel
            .write_line(emotion.as_str())
            .await
            .map_err(|e| Error::channel(Channel::Pattern, e))?;
        debug!(%emotion, "pattern sent");
        Ok(())
    }

    async fn shutdown(&mut self, grace: Duration) {
        self.channel.terminate(grace).await;
    }
}
