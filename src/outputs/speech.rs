use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::warn;

use super::SpeechSink;
use crate::kernel::scheduler::Channel;
use crate::process::supervisor::{LineChannel, ProcessHandle};
use crate::speech::command::SpeechCommand;
use crate::{Error, Result};

/// Speech unit running as a child process, fed on its stdin.
pub struct ProcessSpeechSink<C: LineChannel = ProcessHandle> {
    channel: C,
}

impl<C: LineChannel> ProcessSpeechSink<C> {
    pub fn new(channel: C) -> Self {
        Self { channel }
    }
}

#[async_trait]
impl<C: LineChannel> SpeechSink for ProcessSpeechSink<C> {
    async fn submit(&mut self, command: SpeechCommand) -> Result<()> {
        if !self.channel.is_alive() {
            return Err(Error::ProcessUnavailable(self.channel.name().to_string()));
        }
        self.channel
            .write_line(&command.to_line())
            .await
            .map_err(|e| Error::channel(Channel::Speech, e))
    }

    async fn shutdown(&mut self, grace: Duration) {
        self.channel.terminate(grace).await;
    }
}

/// Speech unit running as an in-process task.
///
/// Never waits on the task: a full queue rejects the command instead of
/// stalling the control loop.
pub struct ChannelSpeechSink {
    tx: Option<mpsc::Sender<SpeechCommand>>,
    task: Option<JoinHandle<()>>,
}

impl ChannelSpeechSink {
    pub fn new(tx: mpsc::Sender<SpeechCommand>, task: Option<JoinHandle<()>>) -> Self {
        Self { tx: Some(tx), task }
    }
}

#[async_trait]
impl SpeechSink for ChannelSpeechSink {
    async fn submit(&mut self, command: SpeechCommand) -> Result<()> {
        let Some(tx) = self.tx.as_ref() else {
            return Err(Error::ProcessUnavailable("speech task".to_string()));
        };
        match tx.try_send(command) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(Error::channel(Channel::Speech, "speech queue full")),
            Err(TrySendError::Closed(_)) => Err(Error::ProcessUnavailable("speech task".to_string())),
        }
    }

    async fn shutdown(&mut self, grace: Duration) {
        // Closing the queue ends the task once it has worked through what is
        // queued. If the shared shutdown token already fired, the task has
        // dropped its in-flight command and is stopping on its own.
        self.tx = None;
        if let Some(mut task) = self.task.take() {
            if tokio::time::timeout(grace, &mut task).await.is_err() {
                warn!(grace_ms = grace.as_millis() as u64, "speech task unresponsive; aborting");
                task.abort();
            }
        }
    }
}
