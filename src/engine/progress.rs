//! Progress reporting for the frame loop

use std::sync::Arc;

use tracing::{debug, info};

use crate::engine::{TranscodePhase, TranscodeStats};

/// Receives progress events from a transcode run
pub trait ProgressCallback: Send + Sync {
    /// Called when the run enters a new phase
    fn on_phase(&self, phase: TranscodePhase);

    /// Called every `interval` video frames
    fn on_progress(&self, video_frames: u64, black_frames: u64);

    /// Called once after the trailer is written
    fn on_complete(&self, stats: &TranscodeStats);
}

/// Writes progress through `tracing`
pub struct TracingProgressCallback;

impl ProgressCallback for TracingProgressCallback {
    fn on_phase(&self, phase: TranscodePhase) {
        debug!("Phase: {}", phase);
    }

    fn on_progress(&self, video_frames: u64, black_frames: u64) {
        info!(
            "{} frames processed, {} black frame(s) encountered",
            video_frames, black_frames
        );
    }

    fn on_complete(&self, stats: &TranscodeStats) {
        info!(
            "processed {} video and {} audio frames",
            stats.video_frames, stats.audio_frames
        );
        info!("substituted {} black frames", stats.substituted_frames);
    }
}

/// Fans phase changes and periodic frame counts out to callbacks
pub struct ProgressReporter {
    interval: u64,
    phase: Option<TranscodePhase>,
    callbacks: Vec<Arc<dyn ProgressCallback>>,
}

impl ProgressReporter {
    /// Report every `interval` video frames (at least 1) through `tracing`
    pub fn new(interval: u64) -> Self {
        Self::silent(interval).with_callback(Arc::new(TracingProgressCallback))
    }

    /// Reporter without callbacks
    pub fn silent(interval: u64) -> Self {
        Self {
            interval: interval.max(1),
            phase: None,
            callbacks: Vec::new(),
        }
    }

    pub fn with_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.callbacks.push(callback);
        self
    }

    pub fn interval(&self) -> u64 {
        self.interval
    }

    pub fn phase(&self) -> Option<TranscodePhase> {
        self.phase
    }

    /// Enter `phase`; repeated calls with the same phase are ignored
    pub fn set_phase(&mut self, phase: TranscodePhase) {
        if self.phase == Some(phase) {
            return;
        }
        self.phase = Some(phase);
        for callback in &self.callbacks {
            callback.on_phase(phase);
        }
    }

    /// Called after each classified video frame
    pub fn video_frame(&self, stats: &TranscodeStats) {
        if stats.video_frames > 0 && stats.video_frames % self.interval == 0 {
            for callback in &self.callbacks {
                callback.on_progress(stats.video_frames, stats.black_frames);
            }
        }
    }

    pub fn complete(&mut self, stats: &TranscodeStats) {
        self.set_phase(TranscodePhase::Completed);
        for callback in &self.callbacks {
            callback.on_complete(stats);
        }
    }
}
