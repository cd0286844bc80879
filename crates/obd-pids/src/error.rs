//! PID Decode Error Types

use thiserror::Error;

/// Field-scoped decode failure.
///
/// Never fatal to a polling cycle: the sampler renders the message into the
/// affected field and moves on.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DecodeError {
    /// Neither the exact "41"+code signature nor a plausible mode-01
    /// response was found
    #[error("No valid PID {code} in response: {response}")]
    MissingSignature { code: String, response: String },

    /// A signature was found but no payload byte follows it
    #[error("Incomplete data in response: {response}")]
    Incomplete { response: String },
}
