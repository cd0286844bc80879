//! OBD-II PID Catalog and Decoding
//!
//! Static registry of the supported mode-01 Parameter IDs and the decoding
//! of raw ELM327 response strings into physical value strings.

mod decode;
mod error;
mod pid;
mod unit;

pub use decode::{decode_response, normalize};
pub use error::DecodeError;
pub use pid::{all, by_command, by_name, enabled, PidDefinition, PidKind, SUPPORTED_PIDS};
pub use unit::SpeedUnit;
