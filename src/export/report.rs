use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::analysis::sequence::{AnomalyEvidence, ScoreSample, SequenceResults};
use crate::analysis::stats::ScoreSummary;
use crate::config::AnalysisConfig;
use crate::data::model::{ClassPair, SampleFrame};

// ---------------------------------------------------------------------------
// Report types
// ---------------------------------------------------------------------------

/// Scores and evidence of one class pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairReport {
    pub pair: ClassPair,
    pub scores: Vec<ScoreSample>,
    pub evidence: AnomalyEvidence,
    pub summary: ScoreSummary,
}

/// Everything needed to look at one analyzed sequence without re-reading
/// the dataset. Written as `report.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceReport {
    pub sequence: String,
    pub class_names: BTreeMap<u32, String>,
    pub colors: BTreeMap<u32, [u8; 3]>,
    pub threshold: f64,
    pub max_anomalies: usize,
    pub frames_seen: usize,
    pub frames_analyzed: usize,
    pub frames_skipped: usize,
    /// Pairs scored at least once, highest max score first.
    pub pairs: Vec<PairReport>,
    pub sample_frame: Option<SampleFrame>,
}

impl SequenceReport {
    pub fn build(
        sequence: &str,
        results: SequenceResults,
        class_names: &BTreeMap<u32, String>,
        colors: BTreeMap<u32, [u8; 3]>,
        config: &AnalysisConfig,
    ) -> Self {
        let SequenceResults {
            scores,
            mut anomalies,
            sample_frame,
            frames_seen,
            frames_analyzed,
            skipped,
        } = results;

        let mut pairs: Vec<PairReport> = scores
            .into_iter()
            .filter_map(|(pair, series)| {
                let evidence = anomalies.remove(&pair).unwrap_or_default();
                let summary = ScoreSummary::from_series(&series, Some(&evidence))?;
                Some(PairReport {
                    pair,
                    scores: series,
                    evidence,
                    summary,
                })
            })
            .collect();
        pairs.sort_by(|a, b| {
            b.summary
                .max
                .total_cmp(&a.summary.max)
                .then(a.pair.cmp(&b.pair))
        });

        SequenceReport {
            sequence: sequence.to_string(),
            class_names: class_names.clone(),
            colors,
            threshold: config.anomaly_threshold,
            max_anomalies: config.max_anomalies,
            frames_seen,
            frames_analyzed,
            frames_skipped: skipped.len(),
            pairs,
            sample_frame,
        }
    }

    pub fn class_name(&self, class: u32) -> String {
        self.class_names
            .get(&class)
            .cloned()
            .unwrap_or_else(|| class.to_string())
    }

    /// "road vs sidewalk"
    pub fn pair_label(&self, pair: ClassPair) -> String {
        format!("{} vs {}", self.class_name(pair.first), self.class_name(pair.second))
    }

    pub fn pair(&self, pair: ClassPair) -> Option<&PairReport> {
        self.pairs.iter().find(|p| p.pair == pair)
    }

    /// Pairs with at least one flagged point index.
    pub fn flagged_pairs(&self) -> impl Iterator<Item = &PairReport> {
        self.pairs.iter().filter(|p| !p.evidence.indices.is_empty())
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let file = std::fs::File::create(path)
            .with_context(|| format!("creating {}", path.display()))?;
        serde_json::to_writer(std::io::BufWriter::new(file), self)
            .with_context(|| format!("writing {}", path.display()))?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)
            .with_context(|| format!("opening {}", path.display()))?;
        let report = serde_json::from_reader(std::io::BufReader::new(file))
            .context("parsing report JSON")?;
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_report() -> SequenceReport {
        let low = ClassPair::new(10, 40).unwrap();
        let high = ClassPair::new(40, 48).unwrap();
        let mut results = SequenceResults::default();
        results.scores.insert(low, vec![ScoreSample { frame: 0, score: 0.2 }]);
        results.scores.insert(
            high,
            vec![
                ScoreSample { frame: 0, score: 0.8 },
                ScoreSample { frame: 1, score: 0.4 },
            ],
        );
        results.anomalies.insert(
            high,
            AnomalyEvidence {
                indices: vec![0, 1],
                flagged_frames: vec![0],
            },
        );
        results.sample_frame = Some(SampleFrame {
            positions: vec![[1.0, 2.0, 0.0], [3.0, -1.0, 0.5]],
            labels: vec![40, 48],
        });
        results.frames_seen = 2;
        results.frames_analyzed = 2;

        let names: BTreeMap<u32, String> = [(10, "car"), (40, "road"), (48, "sidewalk")]
            .into_iter()
            .map(|(k, v)| (k, v.to_string()))
            .collect();
        SequenceReport::build("00", results, &names, BTreeMap::new(), &AnalysisConfig::default())
    }

    #[test]
    fn test_build_orders_by_max_score() {
        let report = sample_report();
        assert_eq!(report.pairs.len(), 2);
        assert_eq!(report.pairs[0].pair, ClassPair::new(40, 48).unwrap());
        assert_eq!(report.pairs[0].summary.flagged_frames, 1);
        assert_eq!(report.pairs[1].evidence, AnomalyEvidence::default());
        assert_eq!(report.flagged_pairs().count(), 1);
        assert_eq!(report.pair_label(report.pairs[0].pair), "road vs sidewalk");
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        let report = sample_report();
        report.save(&path).unwrap();

        let loaded = SequenceReport::load(&path).unwrap();
        assert_eq!(loaded.sequence, "00");
        assert_eq!(loaded.class_names, report.class_names);
        assert_eq!(loaded.pairs.len(), 2);
        assert_eq!(loaded.pairs[0].evidence, report.pairs[0].evidence);
        assert_eq!(loaded.pairs[0].scores[1].frame, 1);
        assert_eq!(loaded.sample_frame, report.sample_frame);
    }
}
