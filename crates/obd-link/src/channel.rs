//! Byte Channel Abstraction over the Adapter Link
//!
//! The [`Channel`] trait is the seam between the command engine and the
//! physical transport. The production implementation is [`SerialChannel`]
//! over `tokio-serial`; tests use [`MockChannel`](crate::mock::MockChannel).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::io;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio_serial::{ClearBuffer, SerialPort, SerialPortBuilderExt, SerialStream};
use tracing::{debug, info};

use crate::error::LinkError;

/// Default baud rate for ELM327 adapters
pub const DEFAULT_BAUD: u32 = 38_400;

/// Serial channel configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Baud rate (default: 38400)
    pub baud: u32,
    /// Read timeout applied to the underlying port (ms)
    pub read_timeout_ms: u64,
    /// Write timeout for outgoing commands (ms)
    pub write_timeout_ms: u64,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            baud: DEFAULT_BAUD,
            read_timeout_ms: 500,
            write_timeout_ms: 500,
        }
    }
}

/// Asynchronous byte channel to an ELM327 adapter.
///
/// Implementations handle the raw link only; framing (the trailing `>`
/// prompt), pacing and retry live in
/// [`CommandExecutor`](crate::executor::CommandExecutor).
#[async_trait]
pub trait Channel: Send {
    /// Write a command to the adapter, appending the `\r` terminator.
    async fn write_command(&mut self, command: &str) -> Result<(), LinkError>;

    /// Append any currently queued bytes to `buf` without blocking.
    ///
    /// Returns the number of bytes appended; zero when nothing is pending.
    async fn read_available(&mut self, buf: &mut Vec<u8>) -> Result<usize, LinkError>;

    /// Drop any stale buffered input.
    async fn discard_input(&mut self) -> Result<(), LinkError>;

    /// Close the channel. Idempotent.
    async fn close(&mut self);

    /// Whether the channel is currently open.
    fn is_open(&self) -> bool;
}

/// Serial port channel over `tokio-serial`.
pub struct SerialChannel {
    device: String,
    stream: Option<SerialStream>,
    write_timeout: Duration,
}

impl SerialChannel {
    /// Open the named serial device.
    ///
    /// Fails with [`LinkError::Connection`] if the device cannot be opened.
    pub fn open(device: &str, config: &ChannelConfig) -> Result<Self, LinkError> {
        info!("Opening serial device {} at {} baud", device, config.baud);

        let builder = tokio_serial::new(device, config.baud)
            .timeout(Duration::from_millis(config.read_timeout_ms));
        let stream = builder
            .open_native_async()
            .map_err(|e| LinkError::Connection(format!("failed to open {device}: {e}")))?;

        Ok(Self {
            device: device.to_string(),
            stream: Some(stream),
            write_timeout: Duration::from_millis(config.write_timeout_ms),
        })
    }

    /// The device path this channel was opened on.
    pub fn device(&self) -> &str {
        &self.device
    }

    fn stream_mut(&mut self) -> Result<&mut SerialStream, LinkError> {
        self.stream
            .as_mut()
            .ok_or_else(|| LinkError::Connection(format!("{} is closed", self.device)))
    }
}

#[async_trait]
impl Channel for SerialChannel {
    async fn write_command(&mut self, command: &str) -> Result<(), LinkError> {
        let timeout = self.write_timeout;
        let stream = self.stream_mut()?;
        let mut frame = command.as_bytes().to_vec();
        frame.push(b'\r');

        tokio::time::timeout(timeout, async {
            stream.write_all(&frame).await?;
            stream.flush().await
        })
        .await
        .map_err(|_| LinkError::Connection("write timed out".to_string()))??;

        Ok(())
    }

    async fn read_available(&mut self, buf: &mut Vec<u8>) -> Result<usize, LinkError> {
        let stream = self.stream_mut()?;
        let mut chunk = [0u8; 256];
        let mut appended = 0;

        loop {
            match stream.try_read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => {
                    buf.extend_from_slice(&chunk[..n]);
                    appended += n;
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) => return Err(e.into()),
            }
        }

        Ok(appended)
    }

    async fn discard_input(&mut self) -> Result<(), LinkError> {
        let stream = self.stream_mut()?;
        stream
            .clear(ClearBuffer::Input)
            .map_err(|e| LinkError::Connection(e.to_string()))
    }

    async fn close(&mut self) {
        if self.stream.take().is_some() {
            debug!("Serial device {} closed", self.device);
        }
    }

    fn is_open(&self) -> bool {
        self.stream.is_some()
    }
}
