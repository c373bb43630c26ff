use async_trait::async_trait;
use serialport::SerialPort;
use std::io::Write;
use std::time::Duration;
use tracing::{debug, info};

use super::AngleSink;
use crate::kernel::scheduler::{Channel, MAX_ANGLE};
use crate::{Error, Result};

pub const DEFAULT_SERIAL_PORT: &str = "/dev/ttyACM0";
pub const DEFAULT_SERIAL_BAUD: u32 = 9600;

/// ASCII angle, clamped to the servo range, newline-terminated.
pub fn format_angle(angle: u8) -> String {
    format!("{}\n", angle.min(MAX_ANGLE))
}

/// Eyebrow servo behind a microcontroller on a serial link.
///
/// The port is opened lazily and dropped after a failed write, so the next
/// send reopens it (e.g. after the board was replugged).
pub struct SerialEyebrow {
    path: String,
    baud: u32,
    timeout: Duration,
    port: Option<Box<dyn SerialPort>>,
}

impl SerialEyebrow {
    pub fn new(path: impl Into<String>, baud: u32, timeout: Duration) -> Self {
        Self {
            path: path.into(),
            baud,
            timeout,
            port: None,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Open the port now instead of on first send.
    pub async fn connect(&mut self) -> Result<()> {
        if self.port.is_some() {
            return Ok(());
        }
        let (path, baud, timeout) = (self.path.clone(), self.baud, self.timeout);
        let port = tokio::task::spawn_blocking(move || open_port(&path, baud, timeout))
            .await
            .map_err(|e| Error::channel(Channel::Eyebrow, e))??;
        self.port = Some(port);
        Ok(())
    }
}

fn open_port(path: &str, baud: u32, timeout: Duration) -> Result<Box<dyn SerialPort>> {
    let port = serialport::new(path, baud).timeout(timeout).open()?;
    info!(port = path, baud, "serial port opened");
    Ok(port)
}

#[async_trait]
impl AngleSink for SerialEyebrow {
    async fn send_angle(&mut self, angle: u8) -> Result<()> {
        let existing = self.port.take();
        let (path, baud, timeout) = (self.path.clone(), self.baud, self.timeout);
        let line = format_angle(angle);

        // Serial IO blocks; keep it off the async workers.
        let (port, written) = tokio::task::spawn_blocking(move || {
            let mut port = match existing {
                Some(port) => port,
                None => match open_port(&path, baud, timeout) {
                    Ok(port) => port,
                    Err(e) => return (None, Err(e)),
                },
            };
            let written = port
                .write_all(line.as_bytes())
                .and_then(|_| port.flush())
                .map_err(Error::from);
            (Some(port), written)
        })
        .await
        .map_err(|e| Error::channel(Channel::Eyebrow, e))?;

        match written {
            Ok(()) => {
                self.port = port;
                debug!(angle, port = %self.path, "angle sent");
                Ok(())
            }
            Err(e) => {
                debug!(port = %self.path, "serial write failed; will reopen on next send");
                Err(Error::channel(Channel::Eyebrow, e))
            }
        }
    }

    async fn close(&mut self) {
        if self.port.take().is_some() {
            info!(port = %self.path, "serial port closed");
        }
    }
}
