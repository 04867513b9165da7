//! bff - black frame filter
//!
//! Re-encodes a video file to H.264/AAC in MP4, replacing frames that a
//! classifier judges to be all black with the most recent good frame.

pub mod adapters;
pub mod cli;
pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod ports;
pub mod utils;

// Re-export commonly used types
pub use config::BffConfig;
pub use domain::classifier::{ClassifierKind, FrameClassifier};
pub use domain::model::Frame;
pub use domain::substitution::{SubstitutionPolicy, Verdict};
pub use engine::{TranscodeJob, TranscodeStats, Transcoder};
pub use error::{BffError, BffResult};

/// Initialize the libav libraries
pub fn init() -> BffResult<()> {
    ffmpeg_next::init().map_err(BffError::Init)?;
    Ok(())
}
