//! Black frame classification over the luma plane
//!
//! Two heuristics are available and exactly one is active per run:
//!
//! - [`StatisticalClassifier`]: mean and standard deviation of luma, with a
//!   fast exit as soon as any sample is brighter than the ceiling.
//! - [`ProportionalClassifier`]: share of samples at or below a dark cutoff.
//!
//! They disagree on some inputs (a mostly black frame with bright noise is
//! black to the proportional test but not the statistical one), so both are
//! kept as independent strategies behind [`FrameClassifier`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::model::LumaPlane;

/// Decides whether a frame is a spurious black frame
pub trait FrameClassifier: Send + Sync {
    /// Pure function of the luma samples
    fn is_black(&self, luma: LumaPlane<'_>) -> bool;

    /// Short name used in logs
    fn name(&self) -> &'static str;
}

/// Thresholds of the statistical test
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatisticalThresholds {
    /// Any sample above this rules the frame out immediately
    pub bright_ceiling: u8,
    pub mean: f64,
    pub stdev: f64,
}

/// Thresholds of the proportional test
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProportionalThresholds {
    /// Samples at or below this count as dark
    pub dark_cutoff: u8,
    /// Minimum share of dark samples, 0.0 - 1.0
    pub proportion: f64,
}

/// Compile-time classifier configuration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassifierThresholds {
    pub statistical: StatisticalThresholds,
    pub proportional: ProportionalThresholds,
}

impl ClassifierThresholds {
    pub const DEFAULT: Self = Self {
        statistical: StatisticalThresholds {
            bright_ceiling: 32,
            mean: 17.0,
            stdev: 1.0,
        },
        proportional: ProportionalThresholds {
            dark_cutoff: 17,
            proportion: 0.86,
        },
    };
}

impl Default for ClassifierThresholds {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Mean and population standard deviation of a luma plane
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LumaStatistics {
    pub min: u8,
    pub max: u8,
    pub mean: f64,
    pub stdev: f64,
}

impl LumaStatistics {
    /// Two-pass statistics over every sample; `None` for an empty plane
    pub fn measure(luma: LumaPlane<'_>) -> Option<Self> {
        let count = luma.sample_count();
        if count == 0 {
            return None;
        }
        let (mut min, mut max, mut sum) = (u8::MAX, u8::MIN, 0u64);
        for row in luma.rows() {
            for &v in row {
                min = min.min(v);
                max = max.max(v);
                sum += u64::from(v);
            }
        }
        let mean = sum as f64 / count as f64;
        Some(Self {
            min,
            max,
            mean,
            stdev: stdev_around(luma, mean),
        })
    }
}

fn stdev_around(luma: LumaPlane<'_>, mean: f64) -> f64 {
    let variance: f64 = luma
        .rows()
        .flat_map(|row| row.iter())
        .map(|&v| (f64::from(v) - mean).powi(2))
        .sum::<f64>()
        / luma.sample_count() as f64;
    variance.sqrt()
}

/// Mean/stdev test with a bright-pixel fast path
#[derive(Debug, Clone, Copy)]
pub struct StatisticalClassifier {
    thresholds: StatisticalThresholds,
}

impl StatisticalClassifier {
    pub fn new(thresholds: StatisticalThresholds) -> Self {
        Self { thresholds }
    }
}

impl Default for StatisticalClassifier {
    fn default() -> Self {
        Self::new(ClassifierThresholds::DEFAULT.statistical)
    }
}

impl FrameClassifier for StatisticalClassifier {
    fn is_black(&self, luma: LumaPlane<'_>) -> bool {
        let count = luma.sample_count();
        if count == 0 {
            return false;
        }

        let ceiling = self.thresholds.bright_ceiling;
        let mut sum = 0u64;
        for row in luma.rows() {
            for &v in row {
                if v > ceiling {
                    return false;
                }
                sum += u64::from(v);
            }
        }

        let mean = sum as f64 / count as f64;
        if mean > self.thresholds.mean {
            return false;
        }
        stdev_around(luma, mean) <= self.thresholds.stdev
    }

    fn name(&self) -> &'static str {
        "statistical"
    }
}

/// Dark-sample proportion test
#[derive(Debug, Clone, Copy)]
pub struct ProportionalClassifier {
    thresholds: ProportionalThresholds,
}

impl ProportionalClassifier {
    pub fn new(thresholds: ProportionalThresholds) -> Self {
        Self { thresholds }
    }

    /// Share of samples at or below the dark cutoff
    pub fn dark_proportion(&self, luma: LumaPlane<'_>) -> f64 {
        let count = luma.sample_count();
        if count == 0 {
            return 0.0;
        }
        let cutoff = self.thresholds.dark_cutoff;
        let dark: usize = luma
            .rows()
            .map(|row| row.iter().filter(|&&v| v <= cutoff).count())
            .sum();
        dark as f64 / count as f64
    }
}

impl Default for ProportionalClassifier {
    fn default() -> Self {
        Self::new(ClassifierThresholds::DEFAULT.proportional)
    }
}

impl FrameClassifier for ProportionalClassifier {
    fn is_black(&self, luma: LumaPlane<'_>) -> bool {
        luma.sample_count() > 0 && self.dark_proportion(luma) >= self.thresholds.proportion
    }

    fn name(&self) -> &'static str {
        "proportional"
    }
}

/// Which classifier a run uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassifierKind {
    #[default]
    Proportional,
    Statistical,
}

impl ClassifierKind {
    /// Instantiate the strategy with the given thresholds
    pub fn build(self, thresholds: ClassifierThresholds) -> Box<dyn FrameClassifier> {
        match self {
            ClassifierKind::Proportional => Box::new(ProportionalClassifier::new(thresholds.proportional)),
            ClassifierKind::Statistical => Box::new(StatisticalClassifier::new(thresholds.statistical)),
        }
    }
}

impl FromStr for ClassifierKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "proportional" => Ok(ClassifierKind::Proportional),
            "statistical" => Ok(ClassifierKind::Statistical),
            other => Err(format!(
                "Invalid classifier: {}. Valid classifiers: proportional, statistical",
                other
            )),
        }
    }
}

impl fmt::Display for ClassifierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClassifierKind::Proportional => write!(f, "proportional"),
            ClassifierKind::Statistical => write!(f, "statistical"),
        }
    }
}
