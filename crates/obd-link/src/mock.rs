//! Mock channel for deterministic testing without hardware.
//!
//! Responses are scripted in order: each written command consumes the next
//! entry, which becomes available to `read_available` on subsequent polls.
//! An entry can be silence, which leaves the executor to run into its
//! timeout. All writes are logged with their timestamps so tests can assert
//! command pacing.

use async_trait::async_trait;
use std::collections::VecDeque;
use tokio::time::Instant;

use crate::channel::Channel;
use crate::error::LinkError;

/// One scripted reaction to a written command.
#[derive(Debug, Clone)]
enum Scripted {
    /// Bytes the adapter sends back
    Reply(Vec<u8>),
    /// No reaction at all; the command times out
    Silence,
}

/// A scripted [`Channel`] for tests.
#[derive(Debug, Default)]
pub struct MockChannel {
    script: VecDeque<Scripted>,
    pending: Vec<u8>,
    writes: Vec<(String, Instant)>,
    closed: bool,
    fail_writes: bool,
}

impl MockChannel {
    /// Create an open mock channel with an empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a reply for the next unanswered command.
    pub fn enqueue_response(&mut self, response: &str) {
        self.script.push_back(Scripted::Reply(response.as_bytes().to_vec()));
    }

    /// Script silence: the next command gets no reply.
    pub fn enqueue_silence(&mut self) {
        self.script.push_back(Scripted::Silence);
    }

    /// Place bytes directly into the receive buffer, as stale input left
    /// over from a previous exchange.
    pub fn inject_stale(&mut self, bytes: &[u8]) {
        self.pending.extend_from_slice(bytes);
    }

    /// Make every subsequent write fail with a connection error.
    pub fn fail_writes(&mut self) {
        self.fail_writes = true;
    }

    /// Commands written so far, in order, with their write timestamps.
    pub fn writes(&self) -> &[(String, Instant)] {
        &self.writes
    }

    /// Commands written so far, without timestamps.
    pub fn written_commands(&self) -> Vec<String> {
        self.writes.iter().map(|(c, _)| c.clone()).collect()
    }

    /// Scripted entries not yet consumed.
    pub fn remaining_script(&self) -> usize {
        self.script.len()
    }
}

#[async_trait]
impl Channel for MockChannel {
    async fn write_command(&mut self, command: &str) -> Result<(), LinkError> {
        if self.closed {
            return Err(LinkError::Connection("mock channel is closed".to_string()));
        }
        if self.fail_writes {
            return Err(LinkError::Connection("mock write failure".to_string()));
        }

        self.writes.push((command.to_string(), Instant::now()));

        match self.script.pop_front() {
            Some(Scripted::Reply(bytes)) => self.pending.extend_from_slice(&bytes),
            Some(Scripted::Silence) | None => {}
        }

        Ok(())
    }

    async fn read_available(&mut self, buf: &mut Vec<u8>) -> Result<usize, LinkError> {
        if self.closed {
            return Err(LinkError::Connection("mock channel is closed".to_string()));
        }

        let n = self.pending.len();
        buf.append(&mut self.pending);
        Ok(n)
    }

    async fn discard_input(&mut self) -> Result<(), LinkError> {
        self.pending.clear();
        Ok(())
    }

    async fn close(&mut self) {
        self.closed = true;
    }

    fn is_open(&self) -> bool {
        !self.closed
    }
}
