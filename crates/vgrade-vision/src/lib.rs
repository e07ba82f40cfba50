//! Vision-language inference client for the VGrade pipeline.
//!
//! Covers the initial whole-video grading pass and the golden-frame
//! re-verification pass, plus the fenced-JSON cleanup every model
//! response goes through.

pub mod client;
pub mod error;
pub mod json_extract;

pub use client::{VideoSource, VisionClient};
pub use error::{VisionError, VisionResult};
pub use json_extract::{extract_json, strip_fences, JsonExtractError};
