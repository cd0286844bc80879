//! Live OBD-II Data Sampling
//!
//! Drives polling cycles over an ELM327 link and assembles per-cycle sample
//! mappings for the streaming collaborator, plus the session facade tying
//! connect, initialize and poll together.

mod sampler;
mod session;

pub use sampler::{
    LiveDataSampler, SampleSet, SamplerConfig, SPEED_UNIT_KEY, TIMESTAMP_KEY,
};
pub use session::ObdSession;
