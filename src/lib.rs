//! Streaming MP4 (M4A) muxer for a single AAC audio track.
//!
//! The header goes out first with a placeholder `mdat` size, encoded frames
//! are appended as they arrive, and the `moov` trailer with the sample index
//! is written last. Box sizes are backpatched by seeking.

pub mod audio;
pub mod config;
pub mod error;
pub mod mp4;

pub use error::{MuxError, Result};
pub use mp4::{Mp4Muxer, MuxSummary, StreamParams, Tags};
