use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::embedding::Embedding;
use crate::speaker::{Enrollments, SpeakerId};

/// Rejection distance for a speaker whose spread cannot be measured.
pub const DEFAULT_THRESHOLD: f32 = 0.70;

/// Upper bound of any calibrated threshold.
pub const MAX_THRESHOLD: f32 = 0.70;

/// Factor applied to a speaker's worst self-distance.
pub const THRESHOLD_MARGIN: f32 = 1.1;

/// Configures [`Calibrator`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibratorConfig {
    /// Multiplier on the maximum intra-speaker distance (default: 1.1).
    pub margin: f32,
    /// Cap on every threshold (default: 0.70).
    pub cap: f32,
    /// Threshold for speakers with fewer than two embeddings (default: 0.70).
    pub default_threshold: f32,
}

impl Default for CalibratorConfig {
    fn default() -> Self {
        Self {
            margin: THRESHOLD_MARGIN,
            cap: MAX_THRESHOLD,
            default_threshold: DEFAULT_THRESHOLD,
        }
    }
}

/// Per-speaker rejection distances.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ThresholdTable {
    thresholds: BTreeMap<SpeakerId, f32>,
}

impl ThresholdTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, speaker: SpeakerId, threshold: f32) {
        self.thresholds.insert(speaker, threshold);
    }

    pub fn get(&self, speaker: &str) -> Option<f32> {
        self.thresholds.get(speaker).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SpeakerId, f32)> {
        self.thresholds.iter().map(|(k, &v)| (k, v))
    }

    pub fn len(&self) -> usize {
        self.thresholds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.thresholds.is_empty()
    }
}

/// Derives each speaker's threshold from the spread of their own enrollment
/// embeddings.
///
/// # Algorithm
///
/// For a speaker with at least two embeddings the threshold is the largest
/// cosine distance over all unordered pairs, times `margin`, capped at `cap`.
/// A speaker with one embedding gets `default_threshold`.
#[derive(Debug, Clone, Default)]
pub struct Calibrator {
    cfg: CalibratorConfig,
}

impl Calibrator {
    /// Creates a Calibrator with default configuration (margin=1.1, cap=0.70,
    /// default=0.70).
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a Calibrator with the given configuration. Out-of-range values
    /// fall back to their defaults and the default threshold never exceeds the
    /// cap.
    pub fn with_config(cfg: CalibratorConfig) -> Self {
        let defaults = CalibratorConfig::default();
        let margin = if cfg.margin.is_finite() && cfg.margin >= 1.0 {
            cfg.margin
        } else {
            defaults.margin
        };
        let cap = if cfg.cap > 0.0 && cfg.cap <= 2.0 {
            cfg.cap
        } else {
            defaults.cap
        };
        let default_threshold = if cfg.default_threshold > 0.0 && cfg.default_threshold <= 2.0 {
            cfg.default_threshold
        } else {
            defaults.default_threshold
        };
        Self {
            cfg: CalibratorConfig {
                margin,
                cap,
                default_threshold: default_threshold.min(cap),
            },
        }
    }

    pub fn config(&self) -> &CalibratorConfig {
        &self.cfg
    }

    /// Computes the threshold table for every enrolled speaker.
    pub fn calibrate(&self, enrolled: &Enrollments) -> ThresholdTable {
        let mut table = ThresholdTable::new();
        for record in enrolled {
            table.insert(record.speaker.clone(), self.calibrate_speaker(&record.embeddings));
        }
        table
    }

    /// Computes one speaker's threshold from their embeddings.
    pub fn calibrate_speaker(&self, embeddings: &[Embedding]) -> f32 {
        if embeddings.len() < 2 {
            return self.cfg.default_threshold;
        }
        let mut max_dist: f32 = 0.0;
        for (i, a) in embeddings.iter().enumerate() {
            for b in &embeddings[i + 1..] {
                max_dist = max_dist.max(a.distance(b));
            }
        }
        (max_dist * self.cfg.margin).clamp(0.0, self.cfg.cap)
    }
}

/// Calibrates with the default configuration.
pub fn calibrate(enrolled: &Enrollments) -> ThresholdTable {
    Calibrator::new().calibrate(enrolled)
}
