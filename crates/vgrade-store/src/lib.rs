//! Job state store for the VGrade pipeline.
//!
//! One persisted record per grading job, written by the phases through
//! field-scoped patches and read by progress pollers. Ships a REST
//! client for the hosted record store, an in-memory twin with identical
//! semantics, and the bounded progress poller.

pub mod error;
pub mod memory;
pub mod poller;
pub mod rest;
pub mod store;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryJobStore;
pub use poller::ProgressPoller;
pub use rest::RestJobStore;
pub use store::JobStore;
