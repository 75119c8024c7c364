use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};

use super::report::SequenceReport;
use crate::analysis::stats::ClassCounts;

// ---------------------------------------------------------------------------
// scenes_overview.csv – points per class for every sequence
// ---------------------------------------------------------------------------

/// One row per sequence: `seq NN`, a count per configured class, the total.
/// The header row holds a blank cell, the class names and `Total`.
pub fn write_scenes_overview(
    path: &Path,
    class_names: &BTreeMap<u32, String>,
    rows: &[(String, ClassCounts)],
) -> Result<()> {
    let mut writer =
        csv::Writer::from_path(path).with_context(|| format!("creating {}", path.display()))?;

    let mut header = vec![" ".to_string()];
    header.extend(class_names.values().cloned());
    header.push("Total".to_string());
    writer.write_record(&header).context("writing CSV header")?;

    for (sequence, counts) in rows {
        let mut record = vec![format!("seq {sequence}")];
        record.extend(class_names.keys().map(|id| counts.count(*id).to_string()));
        record.push(counts.total.to_string());
        writer
            .write_record(&record)
            .with_context(|| format!("writing row for sequence {sequence}"))?;
    }
    writer.flush().context("flushing CSV")?;
    Ok(())
}

// ---------------------------------------------------------------------------
// pair_summary.csv – one row per scored class pair
// ---------------------------------------------------------------------------

pub fn write_pair_summary(path: &Path, report: &SequenceReport) -> Result<()> {
    let mut writer =
        csv::Writer::from_path(path).with_context(|| format!("creating {}", path.display()))?;
    writer
        .write_record([
            "class1",
            "class2",
            "name1",
            "name2",
            "frames_scored",
            "mean",
            "min",
            "max",
            "flagged_frames",
            "evidence_points",
        ])
        .context("writing CSV header")?;

    for p in &report.pairs {
        let s = &p.summary;
        writer
            .write_record(&[
                p.pair.first.to_string(),
                p.pair.second.to_string(),
                report.class_name(p.pair.first),
                report.class_name(p.pair.second),
                s.count.to_string(),
                format!("{:.6}", s.mean),
                format!("{:.6}", s.min),
                format!("{:.6}", s.max),
                s.flagged_frames.to_string(),
                s.evidence_points.to_string(),
            ])
            .with_context(|| format!("writing row for pair {}", p.pair))?;
    }
    writer.flush().context("flushing CSV")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scenes_overview_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scenes_overview.csv");
        let names: BTreeMap<u32, String> = [(0, "unlabeled"), (40, "road")]
            .into_iter()
            .map(|(k, v)| (k, v.to_string()))
            .collect();
        let mut counts = ClassCounts::new(names.keys());
        counts.add_labels(&[40, 40, 0, 77]);

        write_scenes_overview(&path, &names, &[("00".to_string(), counts)]).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], " ,unlabeled,road,Total");
        assert_eq!(lines[1], "seq 00,1,2,4");
    }
}
