//! ELM327 Initialization Sequence
//!
//! Linear state machine with no backward transitions: reset the adapter,
//! verify its identity, then apply the fixed configuration set. A failed
//! reset aborts before any configuration command is written.

use tracing::{debug, info, warn};

use crate::channel::Channel;
use crate::command;
use crate::error::LinkError;
use crate::executor::CommandExecutor;

/// Stage of the initialization sequence, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitStage {
    /// ATZ sent with the long timeout; identity must be observed
    Reset,
    /// Fixed-order configuration commands
    Configure,
    /// Adapter configured and ready for mode-01 queries
    Ready,
}

/// Configuration commands applied after a successful reset, in this order.
const CONFIGURE_SEQUENCE: [&str; 5] = [
    command::ECHO_OFF,
    command::LINEFEEDS_OFF,
    command::SPACES_OFF,
    command::HEADERS_OFF,
    command::PROTOCOL_AUTO,
];

/// Runs the reset+configure sequence and connectivity checks against an
/// executor.
pub struct AdapterInitializer<'a, C> {
    executor: &'a CommandExecutor<C>,
}

impl<'a, C: Channel> AdapterInitializer<'a, C> {
    pub fn new(executor: &'a CommandExecutor<C>) -> Self {
        Self { executor }
    }

    /// Run the full initialization sequence.
    ///
    /// Reset uses the long timeout and must echo the `ELM327` identity, or
    /// the whole sequence fails without issuing a single configuration
    /// write. Any configuration command the adapter rejects aborts with
    /// [`LinkError::Configuration`].
    pub async fn initialize(&self) -> Result<(), LinkError> {
        info!("Initializing ELM327 adapter");

        let mut stage = InitStage::Reset;
        debug!("Init stage: {:?}", stage);

        let reset = self
            .executor
            .execute_with_timeout(command::RESET, self.executor.reset_timeout())
            .await?;
        if !reset.success || !reset.response.contains(command::ELM_SIGNATURE) {
            warn!("ELM327 not detected after reset: {}", reset.response);
            return Err(LinkError::Configuration {
                command: command::RESET.to_string(),
                detail: format!("adapter identity missing in '{}'", reset.response),
            });
        }

        stage = InitStage::Configure;
        debug!("Init stage: {:?}", stage);

        for cmd in CONFIGURE_SEQUENCE {
            let result = self.executor.execute(cmd).await?;
            if !result.success {
                warn!("Configuration command {} rejected", cmd);
                return Err(LinkError::Configuration {
                    command: cmd.to_string(),
                    detail: result
                        .error
                        .unwrap_or_else(|| format!("rejected: {}", result.response)),
                });
            }
        }

        stage = InitStage::Ready;
        debug!("Init stage: {:?}", stage);
        info!("ELM327 initialization complete");
        Ok(())
    }

    /// Lightweight connectivity test: send only the identity command and
    /// look for the `ELM327` signature, case-insensitively.
    pub async fn probe(&self) -> Result<bool, LinkError> {
        let result = self.executor.execute(command::IDENTITY).await?;
        let detected = result.success
            && result
                .response
                .to_ascii_uppercase()
                .contains(command::ELM_SIGNATURE);
        debug!("Probe response '{}', detected={}", result.response, detected);
        Ok(detected)
    }

    /// Read the adapter supply voltage, if the adapter answers.
    pub async fn voltage(&self) -> Option<String> {
        match self.executor.execute(command::VOLTAGE).await {
            Ok(result) if result.success => Some(result.response),
            _ => None,
        }
    }

    /// Describe the active bus protocol, if the adapter answers.
    pub async fn protocol_description(&self) -> Option<String> {
        match self.executor.execute(command::DESCRIBE_PROTOCOL).await {
            Ok(result) if result.success => Some(result.response),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockChannel;

    fn full_init_mock() -> MockChannel {
        let mut mock = MockChannel::new();
        mock.enqueue_response("ELM327 v1.5\r\n>");
        for _ in 0..CONFIGURE_SEQUENCE.len() {
            mock.enqueue_response("OK\r\n>");
        }
        mock
    }

    async fn written(exec: &CommandExecutor<MockChannel>) -> Vec<String> {
        exec.inner.lock().await.channel.written_commands()
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_initialization_sequence() {
        let exec = CommandExecutor::new(full_init_mock());
        let init = AdapterInitializer::new(&exec);

        init.initialize().await.unwrap();

        assert_eq!(
            written(&exec).await,
            vec!["ATZ", "ATE0", "ATL0", "ATS0", "ATH0", "ATSP0"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_identity_aborts_before_configuration() {
        let mut mock = MockChannel::new();
        mock.enqueue_response("SEARCHING...\r\n>");
        let exec = CommandExecutor::new(mock);
        let init = AdapterInitializer::new(&exec);

        let err = init.initialize().await.unwrap_err();
        assert!(matches!(err, LinkError::Configuration { .. }));

        // Only the reset was written; no configuration command went out.
        assert_eq!(written(&exec).await, vec!["ATZ"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_configure_command_aborts() {
        let mut mock = MockChannel::new();
        mock.enqueue_response("ELM327 v1.5\r\n>");
        mock.enqueue_response("OK\r\n>"); // ATE0
        mock.enqueue_response("?\r\n>"); // ATL0 rejected
        let exec = CommandExecutor::new(mock);
        let init = AdapterInitializer::new(&exec);

        let err = init.initialize().await.unwrap_err();
        match err {
            LinkError::Configuration { command, .. } => assert_eq!(command, "ATL0"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_probe_detects_identity_case_insensitively() {
        let mut mock = MockChannel::new();
        mock.enqueue_response("elm327 v2.1\r\n>");
        let exec = CommandExecutor::new(mock);
        let init = AdapterInitializer::new(&exec);

        assert!(init.probe().await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_probe_rejects_foreign_identity() {
        let mut mock = MockChannel::new();
        mock.enqueue_response("STN1110 v5.0\r\n>");
        let exec = CommandExecutor::new(mock);
        let init = AdapterInitializer::new(&exec);

        assert!(!init.probe().await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_voltage_and_protocol_queries() {
        let mut mock = MockChannel::new();
        mock.enqueue_response("12.6V\r\n>");
        mock.enqueue_response("AUTO,ISO15765-4(CAN11/500)\r\n>");
        let exec = CommandExecutor::new(mock);
        let init = AdapterInitializer::new(&exec);

        assert_eq!(init.voltage().await.as_deref(), Some("12.6V"));
        assert!(init
            .protocol_description()
            .await
            .unwrap()
            .contains("ISO15765-4"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_voltage_none_on_rejection() {
        let mut mock = MockChannel::new();
        mock.enqueue_response("?\r\n>");
        let exec = CommandExecutor::new(mock);
        let init = AdapterInitializer::new(&exec);

        assert_eq!(init.voltage().await, None);
    }
}
