//! Image-generation provider client, status poll loop and the tracker that
//! owns the current generation job.

pub mod api;
pub mod config;
pub mod poller;
pub mod tracker;

pub use api::{GenerationApi, GenerationApiError, GenerationBackend};
pub use config::GenerationConfig;
pub use poller::{PollConfig, PollError, PollOutcome};
pub use tracker::{GenerationJob, JobTracker};
