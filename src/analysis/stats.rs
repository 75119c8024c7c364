use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::histogram::add_counts;
use super::sequence::{AnomalyEvidence, ScoreSample};
use crate::data::model::Frame;

/// Bins of the per-class remission curves.
pub const INTENSITY_CURVE_BINS: usize = 100;

// ---------------------------------------------------------------------------
// ClassCounts – points per class over a sequence
// ---------------------------------------------------------------------------

/// Point counts per configured class. Labels not in the configuration are
/// counted separately so they can be reported.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassCounts {
    pub per_class: BTreeMap<u32, u64>,
    pub unknown: BTreeMap<u32, u64>,
    pub total: u64,
}

impl ClassCounts {
    /// Start with every configured class at zero.
    pub fn new<'a>(classes: impl IntoIterator<Item = &'a u32>) -> Self {
        ClassCounts {
            per_class: classes.into_iter().map(|&c| (c, 0)).collect(),
            unknown: BTreeMap::new(),
            total: 0,
        }
    }

    pub fn add_labels(&mut self, labels: &[u32]) {
        for &label in labels {
            match self.per_class.get_mut(&label) {
                Some(n) => *n += 1,
                None => *self.unknown.entry(label).or_insert(0) += 1,
            }
        }
        self.total += labels.len() as u64;
    }

    pub fn count(&self, class: u32) -> u64 {
        self.per_class.get(&class).copied().unwrap_or(0)
    }
}

// ---------------------------------------------------------------------------
// IntensityCurves – remission histogram per class
// ---------------------------------------------------------------------------

/// Remission histograms over [0, 1], one per configured class, summed over
/// all frames of a sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntensityCurves {
    pub bins: usize,
    pub curves: BTreeMap<u32, Vec<u64>>,
}

impl IntensityCurves {
    pub fn new<'a>(classes: impl IntoIterator<Item = &'a u32>, bins: usize) -> Self {
        IntensityCurves {
            bins,
            curves: classes.into_iter().map(|&c| (c, vec![0; bins])).collect(),
        }
    }

    pub fn add_frame(&mut self, frame: &Frame) {
        for (class, counts) in self.curves.iter_mut() {
            let values = frame
                .points()
                .iter()
                .zip(frame.labels())
                .filter(|(_, &l)| l == *class)
                .map(|(p, _)| p[3] as f64);
            add_counts(counts, values, (0.0, 1.0));
        }
    }

    /// Lower edge of every bin.
    pub fn bin_edges(&self) -> Vec<f64> {
        (0..self.bins).map(|i| i as f64 / self.bins as f64).collect()
    }
}

// ---------------------------------------------------------------------------
// ScoreSummary – one line per class pair
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreSummary {
    /// Frames in which the pair was scored.
    pub count: usize,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    /// Frames above the anomaly threshold.
    pub flagged_frames: usize,
    pub evidence_points: usize,
}

impl ScoreSummary {
    /// `None` for an empty series.
    pub fn from_series(series: &[ScoreSample], evidence: Option<&AnomalyEvidence>) -> Option<Self> {
        if series.is_empty() {
            return None;
        }
        let (sum, min, max) = series.iter().fold(
            (0.0, f64::INFINITY, f64::NEG_INFINITY),
            |(sum, min, max), s| (sum + s.score, min.min(s.score), max.max(s.score)),
        );
        Some(ScoreSummary {
            count: series.len(),
            mean: sum / series.len() as f64,
            min,
            max,
            flagged_frames: evidence.map_or(0, |e| e.flagged_frames.len()),
            evidence_points: evidence.map_or(0, |e| e.indices.len()),
        })
    }
}
