//! HTTP API for the VGrade grading pipeline.
//!
//! Inbound surface only: submit a scan, read the job record, poll the
//! progress contract. The grading itself runs on the shared runtime via
//! the worker crate's executor.

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod routes;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
