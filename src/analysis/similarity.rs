use serde::{Deserialize, Serialize};

use super::binning::DistanceBinner;
use super::histogram::{auto_range, density_histogram, overlap_ratio};
use crate::config::{AnalysisConfig, ConfigError, ScoreWeights};
use crate::data::model::Frame;

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// Overlap terms of one qualifying band.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BandTerms {
    /// `class1` share of the band's points of both classes.
    pub spatial: f64,
    /// Overlap of the intensity density histograms over the fixed range.
    pub intensity: f64,
    /// Overlap of the height density histograms, each over its own range.
    pub height: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandStats {
    pub band: usize,
    pub first_count: usize,
    pub second_count: usize,
    /// `None` when either class has too few points in the band.
    pub terms: Option<BandTerms>,
}

/// Per-band detail plus the averaged terms and the weighted composite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityBreakdown {
    pub bands: Vec<BandStats>,
    pub spatial: f64,
    pub intensity: f64,
    pub height: f64,
    pub composite: f64,
}

// ---------------------------------------------------------------------------
// Scorer
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Clone)]
struct ClassSamples {
    intensity: Vec<f64>,
    height: Vec<f64>,
}

/// Cross-class similarity of two semantic classes within one frame.
///
/// The frame is split into distance bands. In every band where both classes
/// have at least `min_points_per_band` points three overlap terms are
/// computed; each term is averaged over the qualifying bands (0 when there are
/// none) and the averages are combined with [`ScoreWeights`].
///
/// The spatial term is a proportion, not an intersection-over-union, and it
/// is asymmetric: `spatial(a, b) + spatial(b, a) == 1` per band.
#[derive(Debug, Clone)]
pub struct SimilarityScorer {
    binner: DistanceBinner,
    min_points: usize,
    bins: usize,
    intensity_range: (f64, f64),
    epsilon: f64,
    weights: ScoreWeights,
}

impl SimilarityScorer {
    /// Fails when `config` does not validate.
    pub fn new(config: &AnalysisConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(SimilarityScorer {
            binner: DistanceBinner::new(config.band_upper_bounds.clone())?,
            min_points: config.min_points_per_band,
            bins: config.histogram_bins,
            intensity_range: (config.intensity_range[0], config.intensity_range[1]),
            epsilon: config.epsilon,
            weights: config.weights,
        })
    }

    pub fn binner(&self) -> &DistanceBinner {
        &self.binner
    }

    /// Composite score of `(class1, class2)` on `frame`, in [0, 1].
    pub fn score(&self, frame: &Frame, class1: u32, class2: u32) -> f64 {
        self.breakdown(frame, class1, class2).composite
    }

    pub fn breakdown(&self, frame: &Frame, class1: u32, class2: u32) -> SimilarityBreakdown {
        let bands = self.binner.assign(frame.points());
        self.breakdown_with_bands(frame, &bands, class1, class2)
    }

    /// Same as [`breakdown`](Self::breakdown) with the band of every point
    /// already computed, so one assignment serves all pairs of a frame.
    pub fn breakdown_with_bands(
        &self,
        frame: &Frame,
        bands: &[usize],
        class1: u32,
        class2: u32,
    ) -> SimilarityBreakdown {
        let n_bands = self.binner.band_count();
        let mut first = vec![ClassSamples::default(); n_bands];
        let mut second = vec![ClassSamples::default(); n_bands];

        for ((p, &label), &band) in frame.points().iter().zip(frame.labels()).zip(bands) {
            let side = if label == class1 {
                &mut first[band]
            } else if label == class2 {
                &mut second[band]
            } else {
                continue;
            };
            side.intensity.push(p[3] as f64);
            side.height.push(p[2] as f64);
        }

        let band_stats: Vec<BandStats> = first
            .iter()
            .zip(&second)
            .enumerate()
            .map(|(band, (a, b))| BandStats {
                band,
                first_count: a.intensity.len(),
                second_count: b.intensity.len(),
                terms: self.band_terms(a, b),
            })
            .collect();

        let mean_of = |f: fn(&BandTerms) -> f64| -> f64 {
            let values: Vec<f64> = band_stats.iter().filter_map(|s| s.terms.as_ref().map(f)).collect();
            if values.is_empty() {
                0.0
            } else {
                values.iter().sum::<f64>() / values.len() as f64
            }
        };
        let spatial = mean_of(|t| t.spatial);
        let intensity = mean_of(|t| t.intensity);
        let height = mean_of(|t| t.height);

        let w = self.weights;
        let composite = w.spatial * spatial + w.intensity * intensity + w.height * height;

        SimilarityBreakdown {
            bands: band_stats,
            spatial,
            intensity,
            height,
            composite,
        }
    }

    fn band_terms(&self, a: &ClassSamples, b: &ClassSamples) -> Option<BandTerms> {
        let (n1, n2) = (a.intensity.len(), b.intensity.len());
        if n1 < self.min_points || n2 < self.min_points {
            return None;
        }

        let spatial = n1 as f64 / (n1 as f64 + n2 as f64 + self.epsilon);

        let h1 = density_histogram(a.intensity.iter().copied(), self.bins, self.intensity_range);
        let h2 = density_histogram(b.intensity.iter().copied(), self.bins, self.intensity_range);
        let intensity = overlap_ratio(&h1, &h2, self.epsilon);

        let z1 = density_histogram(a.height.iter().copied(), self.bins, auto_range(&a.height));
        let z2 = density_histogram(b.height.iter().copied(), self.bins, auto_range(&b.height));
        let height = overlap_ratio(&z1, &z2, self.epsilon);

        Some(BandTerms {
            spatial,
            intensity,
            height,
        })
    }
}
