//! Last-good-frame substitution
//!
//! Frames classified black are overwritten with the pixels of the most recent
//! good frame. Timestamps of the overwritten frame are left alone, so the
//! picture freezes while the original timing is preserved.

use tracing::{trace, warn};

use crate::domain::classifier::FrameClassifier;
use crate::domain::model::{copy_pixels, Frame};
use crate::ports::{PlanarImage, PlanarImageMut};

/// Outcome of running one frame through the policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Not black; now the retained frame
    Good,
    /// Black and overwritten with the retained frame
    Substituted,
    /// Black but left as is: nothing retained yet, or the retained frame has another layout
    Unreplaced,
}

impl Verdict {
    pub fn is_black(self) -> bool {
        !matches!(self, Verdict::Good)
    }
}

/// Result of [`SubstitutionPolicy::observe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    Good,
    /// Black; `replaceable` when a retained frame of the same layout exists
    Black { replaceable: bool },
}

/// Retained state: the most recent good frame of one video stream
#[derive(Debug, Default)]
pub struct SubstitutionState {
    last_good: Option<Frame>,
}

impl SubstitutionState {
    pub fn has_good_frame(&self) -> bool {
        self.last_good.is_some()
    }

    pub fn last_good(&self) -> Option<&Frame> {
        self.last_good.as_ref()
    }

    /// Copy `image` into the retained buffer, reusing the allocation when the layout is unchanged
    fn retain(&mut self, image: &impl PlanarImage) {
        match &mut self.last_good {
            Some(frame) if *frame.geometry() == image.geometry() => frame.copy_from(image),
            slot => *slot = Some(Frame::copy_of(image)),
        }
    }
}

/// Classifier plus substitution state for one video stream
pub struct SubstitutionPolicy {
    classifier: Box<dyn FrameClassifier>,
    state: SubstitutionState,
}

impl SubstitutionPolicy {
    pub fn new(classifier: Box<dyn FrameClassifier>) -> Self {
        Self {
            classifier,
            state: SubstitutionState::default(),
        }
    }

    pub fn classifier_name(&self) -> &'static str {
        self.classifier.name()
    }

    pub fn state(&self) -> &SubstitutionState {
        &self.state
    }

    /// Classify `image`; a good frame becomes the retained frame
    pub fn observe(&mut self, image: &impl PlanarImage) -> Observation {
        let black = image
            .luma()
            .is_some_and(|luma| self.classifier.is_black(luma));

        if !black {
            self.state.retain(image);
            return Observation::Good;
        }

        let replaceable = self
            .state
            .last_good
            .as_ref()
            .is_some_and(|good| *good.geometry() == image.geometry());
        if self.state.has_good_frame() && !replaceable {
            warn!(
                "Black frame at pts {:?} has a different layout than the retained frame; leaving it unchanged",
                image.pts()
            );
        }
        Observation::Black { replaceable }
    }

    /// Overwrite the pixels of `image` with the retained frame.
    ///
    /// Returns false, leaving `image` untouched, when nothing compatible is retained.
    pub fn restore(&self, image: &mut impl PlanarImageMut) -> bool {
        match &self.state.last_good {
            Some(good) if *good.geometry() == image.geometry() => {
                copy_pixels(good, &mut *image);
                trace!(
                    "Replaced black frame at pts {:?} with frame from pts {:?}",
                    image.pts(),
                    good.pts()
                );
                true
            }
            _ => false,
        }
    }

    /// Classify and, for black frames, substitute in place
    pub fn process(&mut self, image: &mut impl PlanarImageMut) -> Verdict {
        match self.observe(&*image) {
            Observation::Good => Verdict::Good,
            Observation::Black { replaceable: true } if self.restore(&mut *image) => Verdict::Substituted,
            Observation::Black { .. } => Verdict::Unreplaced,
        }
    }
}
