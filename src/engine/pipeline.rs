//! Classify and substitute stage of the frame loop
//!
//! Independent of libav so it can run over owned frames as well as decoded ones.

use crate::domain::classifier::{ClassifierKind, ClassifierThresholds};
use crate::domain::substitution::{Observation, SubstitutionPolicy, Verdict};
use crate::engine::{ProgressReporter, TranscodePhase, TranscodeStats};
use crate::error::BffResult;
use crate::ports::PlanarImageMut;

/// Per-run video state: substitution policy, counters and progress
pub struct FramePipeline {
    policy: SubstitutionPolicy,
    stats: TranscodeStats,
    progress: ProgressReporter,
}

impl FramePipeline {
    pub fn new(classifier: ClassifierKind, progress: ProgressReporter) -> Self {
        Self {
            policy: SubstitutionPolicy::new(classifier.build(ClassifierThresholds::DEFAULT)),
            stats: TranscodeStats::default(),
            progress,
        }
    }

    pub fn classifier_name(&self) -> &'static str {
        self.policy.classifier_name()
    }

    pub fn policy(&self) -> &SubstitutionPolicy {
        &self.policy
    }

    /// Classify `frame` and replace its pixels if it is black
    pub fn process<F: PlanarImageMut>(&mut self, frame: &mut F) -> Verdict {
        let verdict = self.policy.process(frame);
        self.record(verdict);
        verdict
    }

    /// Like [`process`](Self::process), calling `prepare` on the frame right
    /// before its pixels are overwritten
    pub fn process_with<F, P>(&mut self, frame: &mut F, prepare: P) -> BffResult<Verdict>
    where
        F: PlanarImageMut,
        P: FnOnce(&mut F) -> BffResult<()>,
    {
        let verdict = match self.policy.observe(&*frame) {
            Observation::Good => Verdict::Good,
            Observation::Black { replaceable: true } => {
                prepare(&mut *frame)?;
                if self.policy.restore(&mut *frame) {
                    Verdict::Substituted
                } else {
                    Verdict::Unreplaced
                }
            }
            Observation::Black { replaceable: false } => Verdict::Unreplaced,
        };
        self.record(verdict);
        Ok(verdict)
    }

    pub fn record_audio_frame(&mut self) {
        self.stats.audio_frames += 1;
    }

    pub fn set_phase(&mut self, phase: TranscodePhase) {
        self.progress.set_phase(phase);
    }

    pub fn stats(&self) -> &TranscodeStats {
        &self.stats
    }

    /// Finish the run and hand out the counters
    pub fn complete(mut self) -> TranscodeStats {
        self.progress.complete(&self.stats);
        self.stats
    }

    pub(crate) fn stats_mut(&mut self) -> &mut TranscodeStats {
        &mut self.stats
    }

    fn record(&mut self, verdict: Verdict) {
        self.stats.record(verdict);
        self.progress.video_frame(&self.stats);
    }
}
