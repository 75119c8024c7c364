/// Result consumers: everything that turns analysis results into files.
///
/// * `report`      – `report.json`, the bundle the viewer opens
/// * `overview`    – CSV tables (class counts per sequence, pair summaries)
/// * `score_table` – per-frame scores as Parquet
/// * `render`      – PNG plots

pub mod overview;
pub mod render;
pub mod report;
pub mod score_table;

/// Directory-safe version of a class name.
pub fn file_safe(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}
