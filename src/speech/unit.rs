//! The speech unit: a sequential consumer of speech commands.
//!
//! Commands arrive either as lines (stdin of the `speak` subprocess) or over
//! an in-process channel. Either way one command is handled at a time and
//! later ones wait their turn.

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use super::command::SpeechCommand;
use super::pipeline::SpeechPipeline;
use crate::Result;

/// Read `CHANGE <emotion>` / `SAME` lines until EOF or shutdown.
///
/// Lines are decoded lossily, so a corrupt line is ignored like any other
/// unrecognized command instead of ending the unit.
pub async fn run_lines<R>(
    pipeline: &mut SpeechPipeline,
    mut reader: R,
    shutdown: CancellationToken,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    info!("Speech unit reading commands");
    let mut buf = Vec::new();

    loop {
        buf.clear();
        let read = tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            read = reader.read_until(b'\n', &mut buf) => read?,
        };
        if read == 0 {
            info!("Command channel closed");
            break;
        }

        let line = String::from_utf8_lossy(&buf);
        match SpeechCommand::parse(&line) {
            Some(command) => {
                if !handle(pipeline, command, &shutdown).await {
                    break;
                }
            }
            None if line.trim().is_empty() => {}
            None => debug!(line = %line.trim(), "ignoring unrecognized command"),
        }
    }
    Ok(())
}

/// Consume commands from an in-process channel until it closes or shutdown.
pub async fn run_channel(
    pipeline: &mut SpeechPipeline,
    mut rx: mpsc::Receiver<SpeechCommand>,
    shutdown: CancellationToken,
) {
    loop {
        let command = tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            command = rx.recv() => command,
        };
        let Some(command) = command else { break };
        if !handle(pipeline, command, &shutdown).await {
            break;
        }
    }
    info!("Speech task stopped");
}

/// Run the unit as a tokio task. The returned sender is the command channel.
pub fn spawn_task(
    mut pipeline: SpeechPipeline,
    capacity: usize,
    shutdown: CancellationToken,
) -> (mpsc::Sender<SpeechCommand>, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let handle = tokio::spawn(async move {
        run_channel(&mut pipeline, rx, shutdown).await;
    });
    (tx, handle)
}

/// Returns false if shutdown interrupted the command.
async fn handle(
    pipeline: &mut SpeechPipeline,
    command: SpeechCommand,
    shutdown: &CancellationToken,
) -> bool {
    info!(command = %command, "speech command");
    tokio::select! {
        biased;
        _ = shutdown.cancelled() => {
            info!(command = %command, "speech interrupted by shutdown");
            false
        }
        result = pipeline.handle(command) => {
            if let Err(e) = result {
                error!(command = %command, error = %e, "speech command dropped");
            }
            true
        }
    }
}
