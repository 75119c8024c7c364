use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use image::RgbImage;
use plotters::coord::Shift;
use plotters::drawing::DrawingAreaErrorKind;
use plotters::element::Pixel;
use plotters::prelude::{
    BitMapBackend, ChartBuilder, Circle, Color, DrawingArea, DrawingBackend, IntoDrawingArea,
    PathElement, RGBColor, Rectangle, BLACK, WHITE,
};

use super::file_safe;
use super::report::{PairReport, SequenceReport};
use crate::analysis::histogram::bin_counts;
use crate::analysis::stats::IntensityCurves;
use crate::color::ClassColors;
use crate::data::model::SampleFrame;

const LIGHT_GRAY: RGBColor = RGBColor(211, 211, 211);
const BAR_BLUE: RGBColor = RGBColor(31, 119, 180);
const THRESHOLD_RED: RGBColor = RGBColor(214, 39, 40);

const FONT: &str = "sans-serif";

/// Background points drawn per scatter plot, at most.
pub const MAX_BACKGROUND_POINTS: usize = 50_000;
pub const SCORE_HISTOGRAM_BINS: usize = 20;

type DrawResult<DB> = Result<(), DrawingAreaErrorKind<<DB as DrawingBackend>::ErrorType>>;

/// Whether a chart carries its captions, axis descriptions, tick labels and
/// legend. `Plain` charts draw no text at all and need no system fonts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartText {
    Annotated,
    Plain,
}

impl ChartText {
    fn annotated(self) -> bool {
        self == ChartText::Annotated
    }
}

pub fn anomaly_title(report: &SequenceReport, pair: &PairReport) -> String {
    format!(
        "{} Anomalies (mIoU > {})",
        report.pair_label(pair.pair),
        report.threshold
    )
}

pub fn score_histogram_title(report: &SequenceReport, pair: &PairReport) -> String {
    format!("mIoU Distribution: {}", report.pair_label(pair.pair))
}

// ---------------------------------------------------------------------------
// Bitmap plumbing
// ---------------------------------------------------------------------------

fn drawing_error<E>(e: DrawingAreaErrorKind<E>) -> anyhow::Error
where
    E: std::error::Error + Send + Sync,
{
    anyhow!("{e}")
}

/// Draws into an in-memory RGB buffer of the given size.
fn render_bitmap<F>(width: u32, height: u32, draw: F) -> Result<RgbImage>
where
    F: FnOnce(&DrawingArea<BitMapBackend<'_>, Shift>) -> Result<()>,
{
    let mut buffer = vec![0u8; width as usize * height as usize * 3];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
        draw(&root)?;
        root.present().map_err(drawing_error)?;
    }
    RgbImage::from_raw(width, height, buffer).context("bitmap buffer does not match image size")
}

/// Renders with annotations first. Text needs a system font; when none can
/// be loaded the chart is drawn again without text.
fn render_with_fallback<F>(what: &str, render: F) -> Result<RgbImage>
where
    F: Fn(ChartText) -> Result<RgbImage>,
{
    match render(ChartText::Annotated) {
        Ok(img) => Ok(img),
        Err(e) => {
            log::warn!("Drawing {what} without text: {e:#}");
            render(ChartText::Plain)
        }
    }
}

// ---------------------------------------------------------------------------
// Plots
// ---------------------------------------------------------------------------

/// Top-down (x/y) scatter of the sample frame: a grey subsampled background
/// with the flagged points of the pair drawn in their class colours.
/// Both axes share one scale. Indices past the end of the sample frame are
/// ignored.
pub fn render_anomalies(
    sample: &SampleFrame,
    report: &SequenceReport,
    pair: &PairReport,
    size: u32,
    text: ChartText,
) -> Result<RgbImage> {
    let title = anomaly_title(report, pair);
    let colors = ClassColors::from(report.colors.clone());
    render_bitmap(size, size, |root| {
        draw_anomalies(root, sample, report, pair, &colors, &title, text).map_err(drawing_error)
    })
}

fn draw_anomalies<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    sample: &SampleFrame,
    report: &SequenceReport,
    pair: &PairReport,
    colors: &ClassColors,
    title: &str,
    text: ChartText,
) -> DrawResult<DB> {
    const MARGIN: u32 = 15;

    root.fill(&WHITE)?;
    let Some((min_x, min_y, max_x, max_y)) = xy_bounds(&sample.positions) else {
        return Ok(());
    };

    let area = if text.annotated() {
        root.titled(title, (FONT, 24))?
    } else {
        root.margin(0, 0, 0, 0)
    };
    let (x_labels, y_labels) = if text.annotated() { (40, 60) } else { (0, 0) };

    // equal aspect: one metres-per-pixel factor for both axes
    let (w, h) = area.dim_in_pixel();
    let plot_w = w.saturating_sub(2 * MARGIN + y_labels).max(1) as f64;
    let plot_h = h.saturating_sub(2 * MARGIN + x_labels).max(1) as f64;
    let per_px = ((max_x - min_x) / plot_w)
        .max((max_y - min_y) / plot_h)
        .max(1e-3 / plot_w.min(plot_h))
        * 1.05;
    let (cx, cy) = ((min_x + max_x) / 2.0, (min_y + max_y) / 2.0);
    let (half_w, half_h) = (per_px * plot_w / 2.0, per_px * plot_h / 2.0);

    let mut chart = ChartBuilder::on(&area)
        .margin(MARGIN as i32)
        .x_label_area_size(x_labels as i32)
        .y_label_area_size(y_labels as i32)
        .build_cartesian_2d(cx - half_w..cx + half_w, cy - half_h..cy + half_h)?;

    if text.annotated() {
        chart
            .configure_mesh()
            .x_desc("x [m]")
            .y_desc("y [m]")
            .draw()?;
    }

    let step = (sample.len() / MAX_BACKGROUND_POINTS).max(1);
    chart.draw_series(
        sample
            .positions
            .iter()
            .step_by(step)
            .filter(|p| p[0].is_finite() && p[1].is_finite())
            .map(|p| Pixel::new((p[0] as f64, p[1] as f64), LIGHT_GRAY.filled())),
    )?;

    for class in [pair.pair.first, pair.pair.second] {
        let points: Vec<(f64, f64)> = pair
            .evidence
            .indices
            .iter()
            .filter(|&&i| i < sample.len() && sample.labels[i] == class)
            .map(|&i| {
                let p = sample.positions[i];
                (p[0] as f64, p[1] as f64)
            })
            .collect();
        if points.is_empty() {
            continue;
        }
        let color = colors.plot_color(class);
        chart
            .draw_series(points.into_iter().map(|c| Circle::new(c, 2, color.filled())))?
            .label(report.class_name(class))
            .legend(move |(x, y)| Circle::new((x + 10, y), 4, color.filled()));
    }

    if text.annotated() {
        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()?;
    }
    Ok(())
}

fn xy_bounds(positions: &[[f32; 3]]) -> Option<(f64, f64, f64, f64)> {
    positions
        .iter()
        .filter(|p| p[0].is_finite() && p[1].is_finite())
        .fold(None, |acc, p| {
            let (x, y) = (p[0] as f64, p[1] as f64);
            Some(match acc {
                None => (x, y, x, y),
                Some((a, b, c, d)) => (a.min(x), b.min(y), c.max(x), d.max(y)),
            })
        })
}

/// Histogram of a pair's scores over [0, 1] with a dashed threshold line.
pub fn render_score_histogram(
    report: &SequenceReport,
    pair: &PairReport,
    text: ChartText,
) -> Result<RgbImage> {
    let title = score_histogram_title(report, pair);
    render_bitmap(800, 500, |root| {
        draw_score_histogram(root, pair, report.threshold, &title, text).map_err(drawing_error)
    })
}

fn draw_score_histogram<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    pair: &PairReport,
    threshold: f64,
    title: &str,
    text: ChartText,
) -> DrawResult<DB> {
    root.fill(&WHITE)?;
    let counts = bin_counts(
        pair.scores.iter().map(|s| s.score),
        SCORE_HISTOGRAM_BINS,
        (0.0, 1.0),
    );
    let top = counts.iter().copied().max().unwrap_or(0).max(1) as f64 * 1.1;

    let mut builder = ChartBuilder::on(root);
    builder.margin(15);
    if text.annotated() {
        builder
            .caption(title, (FONT, 24))
            .x_label_area_size(40)
            .y_label_area_size(50);
    }
    let mut chart = builder.build_cartesian_2d(0.0f64..1.0f64, 0.0f64..top)?;

    if text.annotated() {
        chart
            .configure_mesh()
            .x_desc("mIoU Score")
            .y_desc("Frequency")
            .x_labels(11)
            .draw()?;
    }

    let width = 1.0 / SCORE_HISTOGRAM_BINS as f64;
    chart
        .draw_series(counts.iter().enumerate().filter(|&(_, &c)| c > 0).map(|(i, &c)| {
            let x0 = i as f64 * width;
            Rectangle::new([(x0, 0.0), (x0 + width, c as f64)], BAR_BLUE.mix(0.7).filled())
        }))?
        .label("Scores")
        .legend(|(x, y)| Rectangle::new([(x, y - 5), (x + 15, y + 5)], BAR_BLUE.mix(0.7).filled()));

    let t = threshold.clamp(0.0, 1.0);
    let dash = top / 40.0;
    chart
        .draw_series((0..20).map(|k| {
            let y0 = 2.0 * k as f64 * dash;
            PathElement::new(vec![(t, y0), (t, y0 + dash)], THRESHOLD_RED.stroke_width(2))
        }))?
        .label(format!("Threshold ({threshold})"))
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 15, y)], THRESHOLD_RED.stroke_width(2)));

    if text.annotated() {
        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()?;
    }
    Ok(())
}

const GRID_COLS: usize = 4;
const CELL_W: u32 = 400;
const CELL_H: u32 = 300;

/// Grid (4 columns) of per-class remission bar charts, one titled panel per
/// class.
pub fn render_intensity_curves(
    curves: &IntensityCurves,
    names: &BTreeMap<u32, String>,
    colors: &ClassColors,
    text: ChartText,
) -> Result<RgbImage> {
    let rows = curves.curves.len().max(1).div_ceil(GRID_COLS);
    render_bitmap(GRID_COLS as u32 * CELL_W, rows as u32 * CELL_H, |root| {
        draw_intensity_curves(root, curves, names, colors, rows, text).map_err(drawing_error)
    })
}

fn draw_intensity_curves<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    curves: &IntensityCurves,
    names: &BTreeMap<u32, String>,
    colors: &ClassColors,
    rows: usize,
    text: ChartText,
) -> DrawResult<DB> {
    root.fill(&WHITE)?;
    let panels = root.split_evenly((rows, GRID_COLS));
    let edges = curves.bin_edges();
    let width = 1.0 / curves.bins.max(1) as f64;

    for ((class, counts), panel) in curves.curves.iter().zip(panels.iter()) {
        let top = counts.iter().copied().max().unwrap_or(0).max(1) as f64 * 1.1;

        let mut builder = ChartBuilder::on(panel);
        builder.margin(10);
        if text.annotated() {
            let name = names
                .get(class)
                .cloned()
                .unwrap_or_else(|| class.to_string());
            builder
                .caption(name, (FONT, 18))
                .x_label_area_size(35)
                .y_label_area_size(55);
        }
        let mut chart = builder.build_cartesian_2d(0.0f64..1.0f64, 0.0f64..top)?;

        if text.annotated() {
            chart
                .configure_mesh()
                .x_desc("Remission")
                .y_desc("Frequency")
                .x_labels(5)
                .y_labels(5)
                .draw()?;
        }

        let color = colors.plot_color(*class);
        chart.draw_series(
            edges
                .iter()
                .zip(counts)
                .filter(|&(_, &c)| c > 0)
                .map(|(&x0, &c)| Rectangle::new([(x0, 0.0), (x0 + width, c as f64)], color.filled())),
        )?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Files
// ---------------------------------------------------------------------------

fn save_png(img: &RgbImage, path: &Path) -> Result<()> {
    img.save(path)
        .with_context(|| format!("writing {}", path.display()))
}

/// Write `anomalies.png` and `miou_distribution.png` for every flagged pair
/// under `<dir>/<name1>_vs_<name2>/`. Nothing is written without a sample
/// frame. Returns the written files.
pub fn write_pair_plots(dir: &Path, report: &SequenceReport) -> Result<Vec<PathBuf>> {
    let Some(sample) = &report.sample_frame else {
        return Ok(Vec::new());
    };
    let mut written = Vec::new();

    for pair in report.flagged_pairs() {
        let pair_dir = dir.join(format!(
            "{}_vs_{}",
            file_safe(&report.class_name(pair.pair.first)),
            file_safe(&report.class_name(pair.pair.second))
        ));
        std::fs::create_dir_all(&pair_dir)
            .with_context(|| format!("creating {}", pair_dir.display()))?;

        let path = pair_dir.join("anomalies.png");
        let img = render_with_fallback("anomaly scatter", |text| {
            render_anomalies(sample, report, pair, 1000, text)
        })?;
        save_png(&img, &path)?;
        written.push(path);

        if pair.scores.len() > 1 {
            let path = pair_dir.join("miou_distribution.png");
            let img = render_with_fallback("score histogram", |text| {
                render_score_histogram(report, pair, text)
            })?;
            save_png(&img, &path)?;
            written.push(path);
        }
    }
    Ok(written)
}

pub fn write_intensity_curves(
    path: &Path,
    curves: &IntensityCurves,
    names: &BTreeMap<u32, String>,
    colors: &ClassColors,
) -> Result<()> {
    let img = render_with_fallback("intensity curves", |text| {
        render_intensity_curves(curves, names, colors, text)
    })?;
    save_png(&img, path)
}

#[cfg(test)]
mod tests {
    use image::Rgb;

    use super::*;
    use crate::analysis::sequence::{AnomalyEvidence, ScoreSample, SequenceResults};
    use crate::config::AnalysisConfig;
    use crate::data::model::ClassPair;

    fn report(with_sample: bool) -> SequenceReport {
        let pair = ClassPair::new(40, 48).unwrap();
        let mut results = SequenceResults::default();
        results.scores.insert(
            pair,
            vec![
                ScoreSample { frame: 0, score: 0.8 },
                ScoreSample { frame: 1, score: 0.3 },
            ],
        );
        results.anomalies.insert(
            pair,
            AnomalyEvidence {
                // index 5 does not exist in the sample frame
                indices: vec![0, 1, 5],
                flagged_frames: vec![0],
            },
        );
        if with_sample {
            results.sample_frame = Some(SampleFrame {
                positions: vec![[-10.0, -10.0, 0.0], [10.0, 10.0, 0.0], [0.0, 0.0, 0.0]],
                labels: vec![40, 48, 10],
            });
        }
        let mut colors = BTreeMap::new();
        colors.insert(40, [255, 0, 255]);
        colors.insert(48, [0, 150, 255]);
        SequenceReport::build("00", results, &names(), colors, &AnalysisConfig::default())
    }

    fn names() -> BTreeMap<u32, String> {
        [(40, "road"), (48, "sidewalk")]
            .into_iter()
            .map(|(k, v)| (k, v.to_string()))
            .collect()
    }

    fn has_pixel(img: &RgbImage, color: [u8; 3]) -> bool {
        img.pixels().any(|p| p == &Rgb(color))
    }

    /// Dark (text-like) pixels within the given rows.
    fn dark_pixels_in_rows(img: &RgbImage, rows: std::ops::Range<u32>) -> usize {
        img.enumerate_pixels()
            .filter(|(_, y, p)| rows.contains(y) && p.0.iter().all(|&c| c < 100))
            .count()
    }

    #[test]
    fn test_titles() {
        let report = report(true);
        assert_eq!(
            anomaly_title(&report, &report.pairs[0]),
            "road vs sidewalk Anomalies (mIoU > 0.5)"
        );
        assert_eq!(
            score_histogram_title(&report, &report.pairs[0]),
            "mIoU Distribution: road vs sidewalk"
        );
    }

    #[test]
    fn test_anomaly_scatter_colors_flagged_points() {
        let report = report(true);
        let sample = report.sample_frame.as_ref().unwrap();
        let img = render_anomalies(sample, &report, &report.pairs[0], 200, ChartText::Plain).unwrap();
        assert_eq!(img.dimensions(), (200, 200));
        assert!(has_pixel(&img, [255, 0, 255]));
        assert!(has_pixel(&img, [0, 150, 255]));
        assert!(has_pixel(&img, [211, 211, 211]));
    }

    #[test]
    fn test_plain_charts_have_no_text() {
        let report = report(true);
        let img = render_score_histogram(&report, &report.pairs[0], ChartText::Plain).unwrap();
        assert_eq!(img.dimensions(), (800, 500));
        assert!(has_pixel(&img, [214, 39, 40]));
        assert_eq!(dark_pixels_in_rows(&img, 0..500), 0);
    }

    #[test]
    fn test_annotated_histogram_draws_caption() {
        let report = report(true);
        // text rendering depends on an installed font
        let Ok(img) = render_score_histogram(&report, &report.pairs[0], ChartText::Annotated) else {
            return;
        };
        assert_eq!(img.dimensions(), (800, 500));
        assert!(dark_pixels_in_rows(&img, 0..45) > 0);
        // axis descriptions sit below the plot area
        assert!(dark_pixels_in_rows(&img, 450..500) > 0);
    }

    #[test]
    fn test_annotated_scatter_draws_caption_and_legend() {
        let report = report(true);
        let sample = report.sample_frame.as_ref().unwrap();
        let Ok(titled) = render_anomalies(sample, &report, &report.pairs[0], 400, ChartText::Annotated)
        else {
            return;
        };
        let plain = render_anomalies(sample, &report, &report.pairs[0], 400, ChartText::Plain).unwrap();
        assert!(dark_pixels_in_rows(&titled, 0..40) > 0);
        assert_eq!(dark_pixels_in_rows(&plain, 0..40), 0);
    }

    #[test]
    fn test_write_pair_plots() {
        let dir = tempfile::tempdir().unwrap();
        let written = write_pair_plots(dir.path(), &report(true)).unwrap();
        assert_eq!(written.len(), 2);
        assert!(dir.path().join("road_vs_sidewalk/anomalies.png").is_file());
        assert!(dir.path().join("road_vs_sidewalk/miou_distribution.png").is_file());

        let empty = tempfile::tempdir().unwrap();
        assert!(write_pair_plots(empty.path(), &report(false)).unwrap().is_empty());
    }

    #[test]
    fn test_intensity_grid_size() {
        let mut curves = IntensityCurves::new(&[1, 2, 3, 4, 5], 10);
        curves.curves.get_mut(&1).unwrap()[3] = 7;
        let mut configured = BTreeMap::new();
        configured.insert(1, [0, 200, 0]);
        let colors = ClassColors::from(configured);
        let img = render_intensity_curves(&curves, &names(), &colors, ChartText::Plain).unwrap();
        assert_eq!(img.dimensions(), (1600, 600));
        assert!(has_pixel(&img, [0, 200, 0]));
    }

    #[test]
    fn test_write_intensity_curves() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("00.png");
        let curves = IntensityCurves::new(&[40, 48], 10);
        write_intensity_curves(&path, &curves, &names(), &ClassColors::default()).unwrap();
        assert!(path.is_file());
    }
}
