/// Analysis layer: the per-frame similarity metric and the sequence pipeline.
///
/// ```text
///   Frame ──► binning ──► band of every point
///                 │
///                 ▼
///           similarity ──► composite score per (class1, class2)
///                 │           (spatial, intensity, height terms)
///                 ▼
///           sequence ──► score series + bounded anomaly evidence
///
///   stats: class counts, intensity curves, score summaries
/// ```

pub mod binning;
pub mod histogram;
pub mod sequence;
pub mod similarity;
pub mod stats;
