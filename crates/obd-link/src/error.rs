//! ELM327 Link Error Types

use thiserror::Error;

/// Errors that can occur while talking to an ELM327 adapter
#[derive(Debug, Error)]
pub enum LinkError {
    /// Device could not be opened, or the connection dropped mid-exchange
    #[error("Connection error: {0}")]
    Connection(String),

    /// The adapter produced no output before the command timeout
    #[error("No response for command '{command}'")]
    NoResponse { command: String },

    /// The adapter answered with '?', rejecting the command
    #[error("Command '{command}' rejected by adapter: {response}")]
    Adapter { command: String, response: String },

    /// An initialization command failed or the adapter identity was missing
    #[error("Configuration failed at '{command}': {detail}")]
    Configuration { command: String, detail: String },
}

impl From<std::io::Error> for LinkError {
    fn from(err: std::io::Error) -> Self {
        LinkError::Connection(err.to_string())
    }
}
