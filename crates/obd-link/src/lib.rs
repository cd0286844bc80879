//! ELM327 AT-Command Engine
//!
//! This crate provides serialized, paced command execution against
//! ELM327-compatible OBD-II adapters over an abstract byte channel, plus the
//! timing-sensitive reset+configure initialization sequence. Responses are
//! framed only by the trailing `>` prompt and a timeout.

mod channel;
pub mod command;
mod error;
mod executor;
mod init;
pub mod mock;

pub use channel::{Channel, ChannelConfig, SerialChannel, DEFAULT_BAUD};
pub use command::CommandResult;
pub use error::LinkError;
pub use executor::{CommandExecutor, ExecutorConfig};
pub use init::{AdapterInitializer, InitStage};

/// The AT command catalog.
pub use command as at;
