use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use super::similarity::SimilarityScorer;
use crate::config::{AnalysisConfig, ConfigError};
use crate::data::loader::{FrameLoad, SequenceError, SequencePaths, SkipReason};
use crate::data::model::{ClassPair, Frame, SampleFrame};

// ---------------------------------------------------------------------------
// Accumulated results of one sequence
// ---------------------------------------------------------------------------

/// One entry of a pair's score series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreSample {
    /// Position of the frame in the sorted file list.
    pub frame: usize,
    pub score: f64,
}

/// Point indices flagged for a pair, capped at `max_anomalies`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnomalyEvidence {
    pub indices: Vec<usize>,
    /// Every frame where the pair scored above threshold, including frames
    /// that arrived after `indices` was full.
    pub flagged_frames: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedFrame {
    pub index: usize,
    pub id: String,
    pub reason: SkipReason,
}

/// Everything the analyzer produced for one sequence.
#[derive(Debug, Clone, Default)]
pub struct SequenceResults {
    /// Sparse per-pair series: a frame adds an entry only when both classes
    /// are present in it.
    pub scores: BTreeMap<ClassPair, Vec<ScoreSample>>,
    /// Only pairs that were flagged at least once appear here.
    pub anomalies: BTreeMap<ClassPair, AnomalyEvidence>,
    /// First frame that loaded successfully.
    pub sample_frame: Option<SampleFrame>,
    pub frames_seen: usize,
    pub frames_analyzed: usize,
    pub skipped: Vec<SkippedFrame>,
}

impl SequenceResults {
    pub fn series(&self, pair: ClassPair) -> &[ScoreSample] {
        self.scores.get(&pair).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn evidence(&self, pair: ClassPair) -> Option<&AnomalyEvidence> {
        self.anomalies.get(&pair)
    }
}

// ---------------------------------------------------------------------------
// Per-frame scratch buffers
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct FrameScratch {
    bands: Vec<usize>,
    class_counts: HashMap<u32, usize>,
}

impl FrameScratch {
    fn prepare(&mut self, scorer: &SimilarityScorer, frame: &Frame) {
        scorer.binner().assign_into(frame.points(), &mut self.bands);
        self.class_counts.clear();
        for &label in frame.labels() {
            *self.class_counts.entry(label).or_insert(0) += 1;
        }
    }

    fn count(&self, class: u32) -> usize {
        self.class_counts.get(&class).copied().unwrap_or(0)
    }

    /// Give the capacity grown by large frames back to the allocator.
    fn release(&mut self) {
        self.bands.clear();
        self.bands.shrink_to_fit();
        self.class_counts.clear();
        self.class_counts.shrink_to_fit();
    }
}

// ---------------------------------------------------------------------------
// SequenceAnalyzer
// ---------------------------------------------------------------------------

/// Drives the similarity metric over every frame and class pair of a sequence.
///
/// Frames are processed strictly in order. A frame that fails to load is
/// logged and abandoned; it never stops the sequence and is never retried.
#[derive(Debug, Clone)]
pub struct SequenceAnalyzer {
    config: AnalysisConfig,
    scorer: SimilarityScorer,
    pairs: Vec<ClassPair>,
}

impl SequenceAnalyzer {
    /// Fails when `config` does not validate.
    pub fn new(config: AnalysisConfig, pairs: Vec<ClassPair>) -> Result<Self, ConfigError> {
        let scorer = SimilarityScorer::new(&config)?;
        Ok(SequenceAnalyzer {
            config,
            scorer,
            pairs,
        })
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn pairs(&self) -> &[ClassPair] {
        &self.pairs
    }

    /// Analyze every frame of a sequence directory.
    pub fn analyze_sequence(&self, paths: &SequencePaths) -> Result<SequenceResults, SequenceError> {
        Ok(self.analyze_frames(paths.frames()?))
    }

    /// Analyze frames given as `(frame id, load outcome)` in sequence order.
    pub fn analyze_frames<I>(&self, frames: I) -> SequenceResults
    where
        I: IntoIterator<Item = (String, FrameLoad)>,
    {
        let mut results = SequenceResults::default();
        let mut scratch = FrameScratch::default();

        for (index, (id, load)) in frames.into_iter().enumerate() {
            results.frames_seen += 1;

            let frame = match load {
                FrameLoad::Loaded(frame) => frame,
                FrameLoad::Skipped(reason) => {
                    if reason.is_failure() {
                        log::warn!("Error processing frame {id}: {reason}");
                    } else {
                        log::debug!("Skipping frame {id}: {reason}");
                    }
                    results.skipped.push(SkippedFrame { index, id, reason });
                    continue;
                }
            };

            if results.sample_frame.is_none() {
                results.sample_frame = Some(SampleFrame::from(&frame));
            }

            self.analyze_frame(index, &frame, &mut scratch, &mut results);
            results.frames_analyzed += 1;

            if self.config.release_interval > 0 && index % self.config.release_interval == 0 {
                log::debug!("Releasing scratch buffers after frame {index}");
                scratch.release();
            }
        }

        results
    }

    fn analyze_frame(
        &self,
        index: usize,
        frame: &Frame,
        scratch: &mut FrameScratch,
        results: &mut SequenceResults,
    ) {
        scratch.prepare(&self.scorer, frame);

        for &pair in &self.pairs {
            if scratch.count(pair.first) == 0 || scratch.count(pair.second) == 0 {
                continue;
            }

            let score = self
                .scorer
                .breakdown_with_bands(frame, &scratch.bands, pair.first, pair.second)
                .composite;
            results
                .scores
                .entry(pair)
                .or_default()
                .push(ScoreSample { frame: index, score });

            if score > self.config.anomaly_threshold {
                let evidence = results.anomalies.entry(pair).or_default();
                evidence.flagged_frames.push(index);

                let remaining = self.config.max_anomalies.saturating_sub(evidence.indices.len());
                if remaining > 0 {
                    evidence
                        .indices
                        .extend(frame.indices_of_pair(pair).into_iter().take(remaining));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: u32 = 40;
    const B: u32 = 48;

    fn pair() -> ClassPair {
        ClassPair::new(A, B).unwrap()
    }

    /// `per_class` points of each class in band 0 with identical distributions.
    fn similar_frame(per_class: usize) -> Frame {
        let mut points = Vec::new();
        let mut labels = Vec::new();
        for class in [A, B] {
            for i in 0..per_class {
                points.push([5.0, 0.0, i as f32 * 0.01, (i % 20) as f32 / 20.0]);
                labels.push(class);
            }
        }
        Frame::new(points, labels).unwrap()
    }

    fn only_a_frame() -> Frame {
        Frame::new(vec![[5.0, 0.0, 0.0, 0.5]; 30], vec![A; 30]).unwrap()
    }

    fn loaded(id: &str, frame: Frame) -> (String, FrameLoad) {
        (id.to_string(), FrameLoad::Loaded(frame))
    }

    fn analyzer(config: AnalysisConfig) -> SequenceAnalyzer {
        SequenceAnalyzer::new(config, vec![pair()]).unwrap()
    }

    #[test]
    fn test_empty_sequence() {
        let results = analyzer(AnalysisConfig::default()).analyze_frames(Vec::new());
        assert_eq!(results.frames_seen, 0);
        assert!(results.scores.is_empty());
        assert!(results.sample_frame.is_none());
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = AnalysisConfig {
            band_upper_bounds: vec![],
            ..Default::default()
        };
        let err = SequenceAnalyzer::new(config, vec![pair()]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let config = AnalysisConfig {
            anomaly_threshold: 1.5,
            ..Default::default()
        };
        assert!(SequenceAnalyzer::new(config, vec![pair()]).is_err());
    }

    #[test]
    fn test_absent_class_records_no_score() {
        let frames = vec![
            loaded("0", similar_frame(20)),
            loaded("1", only_a_frame()),
            loaded("2", similar_frame(20)),
        ];
        let results = analyzer(AnalysisConfig::default()).analyze_frames(frames);
        let series = results.series(pair());
        assert_eq!(series.len(), 2);
        assert_eq!(series.iter().map(|s| s.frame).collect::<Vec<_>>(), vec![0, 2]);
        assert_eq!(results.frames_analyzed, 3);
    }

    #[test]
    fn test_evidence_is_capped() {
        let config = AnalysisConfig {
            max_anomalies: 50,
            ..AnalysisConfig::default()
        };
        let frames: Vec<_> = (0..5).map(|i| loaded(&i.to_string(), similar_frame(20))).collect();
        let results = analyzer(config).analyze_frames(frames);

        let evidence = results.evidence(pair()).unwrap();
        assert_eq!(evidence.indices.len(), 50);
        // first frame fully, then the first 10 indices of the second frame
        assert_eq!(evidence.indices[..40], (0..40usize).collect::<Vec<_>>()[..]);
        assert_eq!(evidence.indices[40..], (0..10usize).collect::<Vec<_>>()[..]);
        assert_eq!(evidence.flagged_frames, vec![0, 1, 2, 3, 4]);
        assert_eq!(results.series(pair()).len(), 5);
    }

    #[test]
    fn test_below_threshold_is_not_flagged() {
        let config = AnalysisConfig {
            anomaly_threshold: 0.9,
            ..AnalysisConfig::default()
        };
        let results = analyzer(config).analyze_frames(vec![loaded("0", similar_frame(20))]);
        assert_eq!(results.series(pair()).len(), 1);
        assert!(results.evidence(pair()).is_none());
    }

    #[test]
    fn test_skipped_frames_are_isolated() {
        let frames = vec![
            (
                "000000.bin".to_string(),
                FrameLoad::Skipped(SkipReason::Io {
                    file: "000000.bin".into(),
                    message: "permission denied".into(),
                }),
            ),
            loaded("000001.bin", similar_frame(20)),
            (
                "000002.bin".to_string(),
                FrameLoad::Skipped(SkipReason::LengthMismatch { points: 10, labels: 9 }),
            ),
        ];
        let results = analyzer(AnalysisConfig::default()).analyze_frames(frames);

        assert_eq!(results.frames_seen, 3);
        assert_eq!(results.frames_analyzed, 1);
        assert_eq!(results.skipped.len(), 2);
        assert_eq!(results.skipped[0].index, 0);
        assert_eq!(results.skipped[1].id, "000002.bin");
        assert_eq!(results.series(pair())[0].frame, 1);
        assert_eq!(results.sample_frame.as_ref().unwrap().len(), 40);
    }

    #[test]
    fn test_sample_frame_is_first_loaded() {
        let frames = vec![loaded("0", only_a_frame()), loaded("1", similar_frame(20))];
        let results = analyzer(AnalysisConfig::default()).analyze_frames(frames);
        assert_eq!(results.sample_frame.unwrap().labels, vec![A; 30]);
    }

    #[test]
    fn test_release_interval_does_not_change_results() {
        let frames = || (0..7).map(|i| loaded(&i.to_string(), similar_frame(15 + i)));
        let every = analyzer(AnalysisConfig {
            release_interval: 1,
            ..AnalysisConfig::default()
        })
        .analyze_frames(frames());
        let never = analyzer(AnalysisConfig {
            release_interval: 0,
            ..AnalysisConfig::default()
        })
        .analyze_frames(frames());
        assert_eq!(every.scores, never.scores);
        assert_eq!(every.anomalies, never.anomalies);
    }
}
