//! Live-Data Polling
//!
//! One polling cycle queries every enabled PID through the shared
//! [`CommandExecutor`] and assembles a [`SampleSet`]. A failing PID
//! contributes its default value or a diagnostic string; it never blocks
//! the other PIDs in the cycle.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use obd_link::{Channel, CommandExecutor};
use obd_pids::{decode_response, PidDefinition, SpeedUnit};

/// Key under which the cycle timestamp is stored.
pub const TIMESTAMP_KEY: &str = "timestamp";

/// Key under which the active speed unit is stored.
pub const SPEED_UNIT_KEY: &str = "SpeedUnit";

/// Sampler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplerConfig {
    /// Delay between polling cycles in the run loop (ms)
    pub cycle_interval_ms: u64,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            cycle_interval_ms: 500,
        }
    }
}

/// One polling cycle's output: PID name → decoded value string, plus the
/// cycle timestamp and the active speed unit.
///
/// Always contains one entry per enabled PID, even on partial failure.
/// Serializes as a flat string map for the streaming collaborator.
#[derive(Debug, Clone, Serialize)]
#[serde(transparent)]
pub struct SampleSet {
    values: BTreeMap<String, String>,
}

impl SampleSet {
    fn new(unit: SpeedUnit) -> Self {
        let mut values = BTreeMap::new();
        values.insert(
            TIMESTAMP_KEY.to_string(),
            Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        );
        values.insert(SPEED_UNIT_KEY.to_string(), unit.to_string());
        Self { values }
    }

    fn insert(&mut self, name: &str, value: String) {
        self.values.insert(name.to_string(), value);
    }

    /// Value for a key, if present.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// The full mapping.
    pub fn as_map(&self) -> &BTreeMap<String, String> {
        &self.values
    }

    /// Number of entries, including timestamp and unit.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Render as pretty-printed JSON text.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.values)
    }
}

/// Polls the enabled PIDs over a shared executor.
pub struct LiveDataSampler<C> {
    executor: Arc<CommandExecutor<C>>,
    config: SamplerConfig,
    running: AtomicBool,
}

impl<C: Channel> LiveDataSampler<C> {
    /// Create a sampler with the default cycle interval.
    pub fn new(executor: Arc<CommandExecutor<C>>) -> Self {
        Self::with_config(executor, SamplerConfig::default())
    }

    /// Create a sampler with an explicit configuration.
    pub fn with_config(executor: Arc<CommandExecutor<C>>, config: SamplerConfig) -> Self {
        Self {
            executor,
            config,
            running: AtomicBool::new(false),
        }
    }

    /// Run one polling cycle across all enabled PIDs.
    pub async fn sample_once(&self, unit: SpeedUnit) -> SampleSet {
        let mut sample = SampleSet::new(unit);
        for pid in obd_pids::enabled() {
            let value = self.query_pid(pid, unit).await;
            sample.insert(pid.name, value);
        }
        sample
    }

    /// Query and decode a single PID, degrading failures to the PID's
    /// default or a field-local diagnostic.
    async fn query_pid(&self, pid: &PidDefinition, unit: SpeedUnit) -> String {
        match self.executor.execute(pid.command).await {
            Ok(result) if result.success => {
                match decode_response(pid, &result.response, unit) {
                    Ok(value) => value,
                    Err(err) => {
                        warn!("Decode failed for {}: {}", pid.name, err);
                        err.to_string()
                    }
                }
            }
            Ok(result) => {
                warn!(
                    "Adapter rejected {} query ({}), using default",
                    pid.name, result.response
                );
                pid.default.to_string()
            }
            Err(err) => {
                warn!("Query for {} failed after retry: {}", pid.name, err);
                pid.default.to_string()
            }
        }
    }

    /// Poll continuously, pushing one [`SampleSet`] per cycle into `tx`.
    ///
    /// Sends are non-blocking: a full channel drops the sample, since a
    /// slow consumer is the streaming collaborator's problem.
    /// The loop ends when [`stop`](Self::stop) is called or the receiver is
    /// dropped.
    pub async fn run(&self, unit: SpeedUnit, tx: mpsc::Sender<SampleSet>) {
        info!(
            "Starting live-data polling every {} ms",
            self.config.cycle_interval_ms
        );
        self.running.store(true, Ordering::Release);

        while self.running.load(Ordering::Acquire) {
            let sample = self.sample_once(unit).await;
            match tx.try_send(sample) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    debug!("Consumer lagging, sample dropped");
                }
                Err(TrySendError::Closed(_)) => {
                    info!("Consumer gone, stopping polling");
                    break;
                }
            }
            sleep(Duration::from_millis(self.config.cycle_interval_ms)).await;
        }

        self.running.store(false, Ordering::Release);
        info!("Live-data polling stopped");
    }

    /// Ask a running poll loop to stop after its current cycle.
    pub fn stop(&self) {
        self.running.store(false, Ordering::Release);
    }

    /// Whether the poll loop is active.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}
