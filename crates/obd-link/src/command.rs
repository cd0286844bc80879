//! ELM327 AT Command Catalog
//!
//! AT commands are handled by the ELM327 chipset itself and are never
//! forwarded to the vehicle bus. See the ELM327 data sheet; it is not always
//! accurate, but it is the best reference available.

/// Reset the adapter to default settings. Reinitializes internal adapter
/// state and needs the long timeout.
pub const RESET: &str = "ATZ";

/// Request the adapter identification string.
pub const IDENTITY: &str = "ATI";

/// Turn off command echo.
pub const ECHO_OFF: &str = "ATE0";

/// Turn off linefeeds in responses.
pub const LINEFEEDS_OFF: &str = "ATL0";

/// Turn off spaces in responses.
pub const SPACES_OFF: &str = "ATS0";

/// Turn off headers in responses.
pub const HEADERS_OFF: &str = "ATH0";

/// Set protocol to automatic detection.
pub const PROTOCOL_AUTO: &str = "ATSP0";

/// Read the adapter supply voltage.
pub const VOLTAGE: &str = "ATRV";

/// Describe the current protocol.
pub const DESCRIBE_PROTOCOL: &str = "ATDP";

/// Describe the current protocol by number.
pub const DESCRIBE_PROTOCOL_NUMBER: &str = "ATDPN";

/// Close the current protocol session.
pub const CLOSE_PROTOCOL: &str = "ATPC";

/// Substring that identifies a genuine (or clone) ELM327 in the ATZ/ATI
/// response.
pub const ELM_SIGNATURE: &str = "ELM327";

/// Result of one command invocation against the adapter.
///
/// `response` is the cleaned text: prompt, carriage returns, linefeeds and
/// literal spaces stripped. An unsuccessful result means the adapter
/// answered with '?'; transport-level failures surface as
/// [`LinkError`](crate::LinkError) instead.
#[derive(Debug, Clone)]
pub struct CommandResult {
    /// Whether the adapter accepted the command
    pub success: bool,
    /// Cleaned response text
    pub response: String,
    /// Error detail when the adapter rejected the command
    pub error: Option<String>,
}

impl CommandResult {
    /// An accepted command with its cleaned response.
    pub fn ok(response: String) -> Self {
        Self {
            success: true,
            response,
            error: None,
        }
    }

    /// A command the adapter rejected with '?'.
    pub fn rejected(command: &str, response: String) -> Self {
        let error = format!("Command '{command}' returned error: {response}");
        Self {
            success: false,
            response,
            error: Some(error),
        }
    }
}
