//! Grading pipeline orchestration.
//!
//! The executor fans a job out into two concurrent flows: the initial
//! vision-model pass (Phase 1) and the CV pipeline (Phase 2, golden
//! frames -> multi-frame re-verification -> grade fusion). Both write
//! field-scoped patches into the shared job record; progress readers
//! poll that record.

pub mod config;
pub mod context;
pub mod error;
pub mod executor;
pub mod logging;
pub mod phase_one;
pub mod phase_two;

pub use config::WorkerConfig;
pub use context::GradingContext;
pub use error::{FailureKind, WorkerError, WorkerResult};
pub use executor::GradingExecutor;
pub use logging::JobLogger;
