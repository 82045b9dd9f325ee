//! B-roll assembly worker.
//!
//! This crate provides:
//! - Timeline planning and visual query resolution
//! - The pipeline orchestrator with bounded scene fan-out and a scene budget
//! - Per-job scratch space, structured job logging and retry helpers
//! - Environment-driven configuration

pub mod audio_source;
pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod pipeline;
pub mod query;
pub mod retry;
pub mod scratch;
pub mod state;
pub mod timeline;

pub use config::{BudgetPolicy, WorkerConfig};
pub use error::{ErrorKind, PipelineError, PipelineResult};
pub use logging::JobLogger;
pub use pipeline::{ClipAcquirer, Pipeline};
pub use query::{QueryResolver, QueryRule};
pub use scratch::ScratchDir;
pub use state::JobStateMachine;
