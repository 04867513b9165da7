//! Transcoding engine module

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::config::BffConfig;
use crate::domain::classifier::ClassifierKind;
use crate::domain::substitution::Verdict;

pub mod pipeline;
pub mod progress;
pub mod transcoder;

pub use pipeline::FramePipeline;
pub use progress::ProgressReporter;
pub use transcoder::Transcoder;

/// One transcode run
#[derive(Debug, Clone, PartialEq)]
pub struct TranscodeJob {
    /// Input file path
    pub input_path: PathBuf,
    /// Output file path, replaced if it exists
    pub output_path: PathBuf,
    /// Black frame strategy
    pub classifier: ClassifierKind,
    /// Filter description for deinterlacing; `None` skips the filter graph
    pub deinterlace_filter: Option<String>,
    /// Log progress every N video frames
    pub progress_interval: u64,
}

impl TranscodeJob {
    pub fn new(input_path: impl Into<PathBuf>, output_path: impl Into<PathBuf>, config: &BffConfig) -> Self {
        let pipeline = &config.pipeline;
        Self {
            input_path: input_path.into(),
            output_path: output_path.into(),
            classifier: config.classifier.strategy,
            deinterlace_filter: pipeline
                .deinterlace
                .then(|| pipeline.deinterlace_filter.clone()),
            progress_interval: pipeline.progress_interval.max(1),
        }
    }
}

/// Transcoding phases
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranscodePhase {
    /// Opening input, creating output and encoders
    Opening,
    /// Reading, decoding, filtering and encoding
    Transcoding,
    /// Draining decoders, filter, resampler and encoders
    Flushing,
    /// Trailer written
    Completed,
}

impl fmt::Display for TranscodePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TranscodePhase::Opening => "opening",
            TranscodePhase::Transcoding => "transcoding",
            TranscodePhase::Flushing => "flushing",
            TranscodePhase::Completed => "completed",
        };
        f.write_str(name)
    }
}

/// Counters collected over one run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranscodeStats {
    /// Video frames run through the classifier
    pub video_frames: u64,
    /// Decoded audio frames
    pub audio_frames: u64,
    /// Video frames classified black
    pub black_frames: u64,
    /// Black frames overwritten with the last good frame
    pub substituted_frames: u64,
    pub video_packets: u64,
    pub audio_packets: u64,
    /// pts/dts values rewritten by the timestamp normalizer
    pub adjusted_timestamps: u64,
    pub elapsed: Duration,
}

impl TranscodeStats {
    /// Count one classified video frame
    pub fn record(&mut self, verdict: Verdict) {
        self.video_frames += 1;
        if verdict.is_black() {
            self.black_frames += 1;
        }
        if verdict == Verdict::Substituted {
            self.substituted_frames += 1;
        }
    }

    /// Black frames emitted unchanged
    pub fn unreplaced_frames(&self) -> u64 {
        self.black_frames - self.substituted_frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_from_config() {
        let mut config = BffConfig::default();
        let job = TranscodeJob::new("in.ts", "out.mp4", &config);
        assert_eq!(job.classifier, ClassifierKind::Proportional);
        assert_eq!(job.deinterlace_filter.as_deref(), Some("yadif=deint=interlaced"));
        assert_eq!(job.progress_interval, 100);

        config.pipeline.deinterlace = false;
        config.classifier.strategy = ClassifierKind::Statistical;
        let job = TranscodeJob::new("in.ts", "out.mp4", &config);
        assert!(job.deinterlace_filter.is_none());
        assert_eq!(job.classifier, ClassifierKind::Statistical);
    }

    #[test]
    fn test_stats_record() {
        let mut stats = TranscodeStats::default();
        for verdict in [Verdict::Unreplaced, Verdict::Good, Verdict::Substituted, Verdict::Substituted] {
            stats.record(verdict);
        }
        assert_eq!(stats.video_frames, 4);
        assert_eq!(stats.black_frames, 3);
        assert_eq!(stats.substituted_frames, 2);
        assert_eq!(stats.unreplaced_frames(), 1);
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(TranscodePhase::Flushing.to_string(), "flushing");
    }
}
