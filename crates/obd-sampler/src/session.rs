//! Adapter Session Facade
//!
//! The outbound surface consumed by collaborators: connect to a device,
//! initialize the adapter, poll live data, read diagnostics. Reconnection
//! after a transport failure is deliberately not attempted here; the
//! session manager owning this object calls [`ObdSession::connect`] again.

use std::sync::Arc;
use tracing::{info, warn};

use obd_link::{
    at, AdapterInitializer, Channel, ChannelConfig, CommandExecutor, LinkError, SerialChannel,
};
use obd_pids::SpeedUnit;

use crate::sampler::{LiveDataSampler, SampleSet, SamplerConfig};

/// One connected adapter: executor, initializer and sampler sharing a
/// single serialized channel.
pub struct ObdSession<C> {
    executor: Arc<CommandExecutor<C>>,
    sampler: LiveDataSampler<C>,
    connected: bool,
}

impl<C> std::fmt::Debug for ObdSession<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObdSession")
            .field("connected", &self.connected)
            .finish_non_exhaustive()
    }
}

impl ObdSession<SerialChannel> {
    /// Open the named serial device at 38400 baud and verify an ELM327 is
    /// answering. The device is closed again if the probe fails.
    pub async fn connect(device: &str) -> Result<Self, LinkError> {
        let channel = SerialChannel::open(device, &ChannelConfig::default())?;
        info!("Device {} opened, probing for ELM327", device);
        Self::connect_over(channel).await
    }
}

impl<C: Channel> ObdSession<C> {
    /// Establish a session over an already-open channel.
    pub async fn connect_over(channel: C) -> Result<Self, LinkError> {
        let executor = Arc::new(CommandExecutor::new(channel));

        let detected = {
            let init = AdapterInitializer::new(&executor);
            match init.probe().await {
                Ok(detected) => detected,
                Err(err) => {
                    executor.close().await;
                    return Err(err);
                }
            }
        };
        if !detected {
            warn!("ELM327 not detected in probe response");
            executor.close().await;
            return Err(LinkError::Connection(
                "ELM327 not detected on device".to_string(),
            ));
        }

        info!("ELM327 detected");
        Ok(Self {
            executor: executor.clone(),
            sampler: LiveDataSampler::new(executor),
            connected: true,
        })
    }

    /// Run the full reset+configure initialization sequence.
    pub async fn initialize(&self) -> Result<(), LinkError> {
        AdapterInitializer::new(&self.executor).initialize().await
    }

    /// Poll every enabled PID once.
    pub async fn sample_once(&self, unit: SpeedUnit) -> SampleSet {
        self.sampler.sample_once(unit).await
    }

    /// Adapter supply voltage, if the adapter answers.
    pub async fn voltage(&self) -> Option<String> {
        AdapterInitializer::new(&self.executor).voltage().await
    }

    /// Active bus protocol description, if the adapter answers.
    pub async fn protocol_description(&self) -> Option<String> {
        AdapterInitializer::new(&self.executor)
            .protocol_description()
            .await
    }

    /// The sampler, for driving the continuous poll loop.
    pub fn sampler(&self) -> &LiveDataSampler<C> {
        &self.sampler
    }

    /// Replace the sampler configuration (cycle interval).
    pub fn set_sampler_config(&mut self, config: SamplerConfig) {
        self.sampler = LiveDataSampler::with_config(self.executor.clone(), config);
    }

    /// Whether the session is connected.
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Close the protocol and the channel. Idempotent.
    pub async fn shutdown(&mut self) {
        if !self.connected {
            return;
        }
        // Best effort; the adapter may already be gone.
        let _ = self.executor.execute(at::CLOSE_PROTOCOL).await;
        self.executor.close().await;
        self.connected = false;
        info!("Session closed");
    }
}
