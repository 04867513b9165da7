//! Error handling module for bff

use std::path::PathBuf;
use thiserror::Error;

/// Exit status used when no more specific code is available
pub const FAILURE_EXIT_CODE: i32 = 2;

/// Main error type for bff operations
#[derive(Error, Debug)]
pub enum BffError {
    /// FFmpeg initialization error
    #[error("Failed to initialize FFmpeg: {0}")]
    Init(ffmpeg_next::Error),

    /// Invalid configuration file or environment override
    #[error("Invalid configuration: {message}")]
    Config { message: String },

    /// A libav call failed; `operation` names the call, `argument` what it was applied to
    #[error("{operation}({argument}) failed; return = {code}", code = av_code(.source))]
    Ffmpeg {
        operation: &'static str,
        argument: String,
        #[source]
        source: ffmpeg_next::Error,
    },

    /// Output path could not be prepared
    #[error("Failed to prepare output {}", .path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl BffError {
    /// Numeric code reported to the shell for this error
    pub fn exit_code(&self) -> i32 {
        let code = match self {
            BffError::Init(source) => av_code(source),
            BffError::Ffmpeg { source, .. } => av_code(source),
            BffError::Filesystem { source, .. } => source.raw_os_error().unwrap_or(FAILURE_EXIT_CODE),
            BffError::Config { .. } => FAILURE_EXIT_CODE,
        };
        // Unix keeps only the low byte of the status.
        if cfg!(unix) && code & 0xff == 0 {
            FAILURE_EXIT_CODE
        } else {
            code
        }
    }
}

fn av_code(error: &ffmpeg_next::Error) -> i32 {
    i32::from(*error)
}

/// Result type alias for bff operations
pub type BffResult<T> = std::result::Result<T, BffError>;

/// Tags a raw libav result with the operation that produced it
pub trait FfmpegResultExt<T> {
    fn during(self, operation: &'static str, argument: impl Into<String>) -> BffResult<T>;
}

impl<T> FfmpegResultExt<T> for Result<T, ffmpeg_next::Error> {
    fn during(self, operation: &'static str, argument: impl Into<String>) -> BffResult<T> {
        self.map_err(|source| BffError::Ffmpeg {
            operation,
            argument: argument.into(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ffmpeg_error_message_names_operation() {
        let err: BffResult<()> = Err(ffmpeg_next::Error::StreamNotFound).during("av_find_best_stream", "video");
        let message = err.unwrap_err().to_string();
        assert!(message.starts_with("av_find_best_stream(video) failed; return = "));
    }

    #[test]
    fn test_reason_is_reported_once_through_source_chain() {
        use std::error::Error as _;

        let err = BffError::Ffmpeg {
            operation: "avformat_open_input",
            argument: "missing.ts".to_string(),
            source: ffmpeg_next::Error::from(-2),
        };
        let reason = ffmpeg_next::Error::from(-2).to_string();
        assert!(!err.to_string().contains(&reason));
        assert_eq!(err.source().map(|s| s.to_string()), Some(reason));

        let err = BffError::Filesystem {
            path: PathBuf::from("out.mp4"),
            source: std::io::Error::from_raw_os_error(13),
        };
        assert_eq!(err.to_string(), "Failed to prepare output out.mp4");
        assert!(err.source().is_some());
    }

    #[test]
    fn test_ffmpeg_exit_code_is_nonzero() {
        let err = BffError::Ffmpeg {
            operation: "avcodec_open2",
            argument: "h264".to_string(),
            source: ffmpeg_next::Error::EncoderNotFound,
        };
        assert_ne!(err.exit_code(), 0);
        assert_ne!(err.exit_code() & 0xff, 0);
    }

    #[test]
    fn test_filesystem_exit_code_uses_os_error() {
        let err = BffError::Filesystem {
            path: PathBuf::from("out.mp4"),
            source: std::io::Error::from_raw_os_error(13),
        };
        assert_eq!(err.exit_code(), 13);
    }

    #[test]
    fn test_config_exit_code() {
        let err = BffError::Config {
            message: "bad strategy".to_string(),
        };
        assert_eq!(err.exit_code(), FAILURE_EXIT_CODE);
    }
}
