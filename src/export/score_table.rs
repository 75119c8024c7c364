use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{Float64Array, UInt32Array, UInt64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

use super::report::SequenceReport;

// ---------------------------------------------------------------------------
// scores.parquet – the full score series in long format
// ---------------------------------------------------------------------------

pub fn score_schema() -> Schema {
    Schema::new(vec![
        Field::new("class1", DataType::UInt32, false),
        Field::new("class2", DataType::UInt32, false),
        Field::new("frame", DataType::UInt64, false),
        Field::new("score", DataType::Float64, false),
    ])
}

/// One row per (pair, scored frame), in report pair order.
pub fn score_batch(report: &SequenceReport) -> Result<RecordBatch> {
    let rows = report.pairs.iter().flat_map(|p| {
        p.scores
            .iter()
            .map(move |s| (p.pair.first, p.pair.second, s.frame as u64, s.score))
    });

    let mut class1 = Vec::new();
    let mut class2 = Vec::new();
    let mut frame = Vec::new();
    let mut score = Vec::new();
    for (a, b, f, s) in rows {
        class1.push(a);
        class2.push(b);
        frame.push(f);
        score.push(s);
    }

    RecordBatch::try_new(
        Arc::new(score_schema()),
        vec![
            Arc::new(UInt32Array::from(class1)),
            Arc::new(UInt32Array::from(class2)),
            Arc::new(UInt64Array::from(frame)),
            Arc::new(Float64Array::from(score)),
        ],
    )
    .context("building score record batch")
}

pub fn write_scores(path: &Path, report: &SequenceReport) -> Result<()> {
    let batch = score_batch(report)?;
    let file =
        std::fs::File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut writer =
        ArrowWriter::try_new(file, batch.schema(), None).context("creating parquet writer")?;
    writer.write(&batch).context("writing score batch")?;
    writer.close().context("closing parquet writer")?;
    Ok(())
}
