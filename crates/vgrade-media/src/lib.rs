//! Source fetch and FFmpeg normalization for the VGrade pipeline.
//!
//! The normalizer turns an arbitrary fetchable video into the canonical
//! analysis format (H.264, capped resolution, reduced frame rate, no
//! audio, streaming-friendly container) through a piped subprocess.

pub mod error;
pub mod fetch;
pub mod normalize;

pub use error::{MediaError, MediaResult};
pub use fetch::fetch_bytes;
pub use normalize::{NormalizerConfig, VideoNormalizer};
