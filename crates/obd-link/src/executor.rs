//! Serialized Command Execution with Pacing and Retry
//!
//! One [`CommandExecutor`] owns the channel and all pacing state behind a
//! single lock. Every command/response exchange goes through it, whether it
//! comes from initialization or polling, so at most one exchange is in
//! flight on the physical link at any instant and successive command starts
//! are at least 100 ms apart.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

use crate::channel::Channel;
use crate::command::CommandResult;
use crate::error::LinkError;

/// Command execution configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Response timeout for ordinary queries (ms)
    pub query_timeout_ms: u64,
    /// Response timeout for adapter reset, which reinitializes internal
    /// adapter state and is slower (ms)
    pub reset_timeout_ms: u64,
    /// Minimum interval between successive command starts (ms)
    pub min_command_interval_ms: u64,
    /// Granularity of the receive poll loop (ms)
    pub poll_interval_ms: u64,
    /// Backoff before the single retry (ms)
    pub retry_backoff_ms: u64,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            query_timeout_ms: 1000,
            reset_timeout_ms: 2000,
            min_command_interval_ms: 100,
            poll_interval_ms: 10,
            retry_backoff_ms: 100,
        }
    }
}

/// Failure classification feeding the retry machine.
///
/// Retry policy is data, not error matching at call sites: transient
/// failures get exactly one retry, fatal ones none.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ErrorClass {
    /// Worth one more attempt (timeout, transport hiccup)
    Transient,
    /// The adapter actively rejected the command; retrying cannot help
    Fatal,
}

fn classify(err: &LinkError) -> ErrorClass {
    match err {
        LinkError::Adapter { .. } => ErrorClass::Fatal,
        LinkError::Connection(_) | LinkError::NoResponse { .. } | LinkError::Configuration { .. } => {
            ErrorClass::Transient
        }
    }
}

/// Two-state retry machine: first try, then at most one retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RetryState {
    FirstTry,
    Retried,
}

pub(crate) struct Inner<C> {
    pub(crate) channel: C,
    /// Start time of the most recent command write, for pacing
    last_command_start: Option<Instant>,
}

/// Serializes command execution against one adapter channel.
pub struct CommandExecutor<C> {
    pub(crate) inner: Mutex<Inner<C>>,
    config: ExecutorConfig,
}

impl<C: Channel> CommandExecutor<C> {
    /// Create an executor with default timings.
    pub fn new(channel: C) -> Self {
        Self::with_config(channel, ExecutorConfig::default())
    }

    /// Create an executor with explicit timings.
    pub fn with_config(channel: C, config: ExecutorConfig) -> Self {
        Self {
            inner: Mutex::new(Inner {
                channel,
                last_command_start: None,
            }),
            config,
        }
    }

    /// The active configuration.
    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Response timeout for the reset command.
    pub fn reset_timeout(&self) -> Duration {
        Duration::from_millis(self.config.reset_timeout_ms)
    }

    /// Execute a command with the ordinary query timeout.
    pub async fn execute(&self, command: &str) -> Result<CommandResult, LinkError> {
        self.execute_with_timeout(command, Duration::from_millis(self.config.query_timeout_ms))
            .await
    }

    /// Execute a command with an explicit response timeout.
    ///
    /// Transient failures (no response, transport error) are retried exactly
    /// once after a short backoff. An adapter `?` rejection is returned as an
    /// unsuccessful [`CommandResult`] without retry; callers decide whether
    /// that is fatal (initialization) or degrades to a default (queries).
    pub async fn execute_with_timeout(
        &self,
        command: &str,
        timeout: Duration,
    ) -> Result<CommandResult, LinkError> {
        let mut state = RetryState::FirstTry;

        loop {
            let err = match self.attempt(command, timeout).await {
                Ok(result) => return Ok(result),
                Err(err) => err,
            };

            match (classify(&err), state) {
                (ErrorClass::Fatal, _) => {
                    if let LinkError::Adapter { response, .. } = &err {
                        warn!("Command '{}' rejected by adapter: {}", command, response);
                        return Ok(CommandResult::rejected(command, response.clone()));
                    }
                    return Err(err);
                }
                (ErrorClass::Transient, RetryState::FirstTry) => {
                    warn!("Command '{}' failed ({}), retrying once", command, err);
                    state = RetryState::Retried;
                    sleep(Duration::from_millis(self.config.retry_backoff_ms)).await;
                }
                (ErrorClass::Transient, RetryState::Retried) => {
                    warn!("Command '{}' failed after retry: {}", command, err);
                    return Err(err);
                }
            }
        }
    }

    /// Close the underlying channel. Idempotent.
    pub async fn close(&self) {
        let mut inner = self.inner.lock().await;
        inner.channel.close().await;
    }

    /// Whether the underlying channel is open.
    pub async fn is_open(&self) -> bool {
        self.inner.lock().await.channel.is_open()
    }

    /// One full send-wait-read exchange under the channel lock.
    async fn attempt(&self, command: &str, timeout: Duration) -> Result<CommandResult, LinkError> {
        let mut inner = self.inner.lock().await;

        // Pace command starts; the ELM327 drops input sent while it is
        // still finishing the previous exchange.
        let min_interval = Duration::from_millis(self.config.min_command_interval_ms);
        if let Some(last) = inner.last_command_start {
            let elapsed = last.elapsed();
            if elapsed < min_interval {
                sleep(min_interval - elapsed).await;
            }
        }

        inner.channel.discard_input().await?;

        debug!("Sending command: {}", command);
        inner.channel.write_command(command).await?;
        inner.last_command_start = Some(Instant::now());

        // Accumulate until the prompt appears or the deadline passes. The
        // prompt is the only framing the adapter provides.
        let deadline = Instant::now() + timeout;
        let poll_interval = Duration::from_millis(self.config.poll_interval_ms);
        let mut buf: Vec<u8> = Vec::new();

        loop {
            inner.channel.read_available(&mut buf).await?;
            if buf.contains(&b'>') {
                break;
            }
            if Instant::now() >= deadline {
                break;
            }
            sleep(poll_interval).await;
        }

        let raw = String::from_utf8_lossy(&buf);
        let cleaned = clean_response(&raw);

        if cleaned.is_empty() {
            return Err(LinkError::NoResponse {
                command: command.to_string(),
            });
        }

        if cleaned.contains('?') {
            return Err(LinkError::Adapter {
                command: command.to_string(),
                response: cleaned,
            });
        }

        debug!("Command '{}' response: {}", command, cleaned);
        Ok(CommandResult::ok(cleaned))
    }
}

/// Strip prompt, carriage returns and linefeeds, trim, and drop literal
/// spaces. Decoding stays tolerant of responses with or without inter-byte
/// spaces regardless of the adapter's ATS setting.
fn clean_response(raw: &str) -> String {
    raw.replace(['>', '\r', '\n'], "").trim().replace(' ', "")
}
