use eframe::egui::{Color32, Ui};
use egui_plot::{Bar, BarChart, Legend, LineStyle, Plot, PlotPoints, Points, VLine};

use rusty_kitti::analysis::histogram::bin_counts;
use rusty_kitti::export::render::{MAX_BACKGROUND_POINTS, SCORE_HISTOGRAM_BINS};
use rusty_kitti::export::report::{PairReport, SequenceReport};

use crate::state::AppState;

// ---------------------------------------------------------------------------
// Central panel – anomaly scatter and score distribution
// ---------------------------------------------------------------------------

/// Render the plots of the selected pair in the central panel.
pub fn pair_plots(ui: &mut Ui, state: &AppState) {
    let Some(report) = &state.report else {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("Open a report to view anomalies  (File → Open report…)");
        });
        return;
    };
    let Some(pair) = state.selected() else {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("Select a class pair");
        });
        return;
    };

    ui.heading(format!("{} (score > {:.2})", report.pair_label(pair.pair), report.threshold));

    let available = ui.available_height();
    anomaly_scatter(ui, state, report, pair, available * 0.62);
    ui.separator();
    score_histogram(ui, report, pair);
}

fn anomaly_scatter(ui: &mut Ui, state: &AppState, report: &SequenceReport, pair: &PairReport, height: f32) {
    let Some(sample) = &report.sample_frame else {
        ui.label("The report has no sample frame.");
        return;
    };

    Plot::new("anomaly_scatter")
        .height(height)
        .data_aspect(1.0)
        .legend(Legend::default())
        .x_axis_label("x [m]")
        .y_axis_label("y [m]")
        .show(ui, |plot_ui| {
            if state.show_background {
                let step = (sample.len() / MAX_BACKGROUND_POINTS).max(1);
                let background: PlotPoints = sample
                    .positions
                    .iter()
                    .step_by(step)
                    .map(|p| [p[0] as f64, p[1] as f64])
                    .collect();
                plot_ui.points(
                    Points::new(background)
                        .name("sample frame")
                        .color(Color32::from_gray(200))
                        .radius(0.8),
                );
            }

            for class in [pair.pair.first, pair.pair.second] {
                let flagged: PlotPoints = pair
                    .evidence
                    .indices
                    .iter()
                    .filter(|&&i| i < sample.len() && sample.labels[i] == class)
                    .map(|&i| {
                        let p = sample.positions[i];
                        [p[0] as f64, p[1] as f64]
                    })
                    .collect();
                plot_ui.points(
                    Points::new(flagged)
                        .name(report.class_name(class))
                        .color(state.colors.color32(class))
                        .radius(2.0),
                );
            }
        });
}

fn score_histogram(ui: &mut Ui, report: &SequenceReport, pair: &PairReport) {
    let counts = bin_counts(
        pair.scores.iter().map(|s| s.score),
        SCORE_HISTOGRAM_BINS,
        (0.0, 1.0),
    );
    let width = 1.0 / SCORE_HISTOGRAM_BINS as f64;
    let bars: Vec<Bar> = counts
        .iter()
        .enumerate()
        .map(|(i, &c)| Bar::new((i as f64 + 0.5) * width, c as f64).width(width * 0.95))
        .collect();

    Plot::new("score_histogram")
        .legend(Legend::default())
        .x_axis_label("Similarity score")
        .y_axis_label("Frames")
        .include_x(0.0)
        .include_x(1.0)
        .include_y(0.0)
        .show(ui, |plot_ui| {
            plot_ui.bar_chart(
                BarChart::new(bars)
                    .name("score distribution")
                    .color(Color32::from_rgb(31, 119, 180)),
            );
            plot_ui.vline(
                VLine::new(report.threshold)
                    .name("threshold")
                    .color(Color32::RED)
                    .style(LineStyle::dashed_loose()),
            );
        });
}
