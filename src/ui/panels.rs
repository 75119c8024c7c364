use std::path::PathBuf;

use eframe::egui::{self, Color32, RichText, Ui};
use egui_extras::{Column, TableBuilder};

use rusty_kitti::export::report::SequenceReport;

use crate::state::AppState;

// ---------------------------------------------------------------------------
// Left side panel – class pair table
// ---------------------------------------------------------------------------

/// Render the left panel: one row per scored class pair.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Class pairs");
    ui.separator();

    let Some(report) = &state.report else {
        ui.label("No report loaded.");
        return;
    };

    ui.label(format!(
        "Threshold {:.2}, evidence cap {}",
        report.threshold, report.max_anomalies
    ));
    ui.add_space(4.0);

    let mut clicked = None;
    TableBuilder::new(ui)
        .striped(true)
        .resizable(true)
        .column(Column::remainder().at_least(140.0))
        .column(Column::auto())
        .column(Column::auto())
        .column(Column::auto())
        .column(Column::auto())
        .header(20.0, |mut header| {
            for title in ["Pair", "Frames", "Mean", "Max", "Flagged"] {
                header.col(|ui| {
                    ui.strong(title);
                });
            }
        })
        .body(|mut body| {
            for p in &report.pairs {
                body.row(18.0, |mut row| {
                    row.col(|ui| {
                        let selected = state.selected_pair == Some(p.pair);
                        let mut text = RichText::new(report.pair_label(p.pair));
                        if !p.evidence.indices.is_empty() {
                            text = text.color(Color32::from_rgb(214, 39, 40));
                        }
                        if ui.selectable_label(selected, text).clicked() {
                            clicked = Some(p.pair);
                        }
                    });
                    row.col(|ui| {
                        ui.label(p.summary.count.to_string());
                    });
                    row.col(|ui| {
                        ui.label(format!("{:.3}", p.summary.mean));
                    });
                    row.col(|ui| {
                        ui.label(format!("{:.3}", p.summary.max));
                    });
                    row.col(|ui| {
                        ui.label(p.summary.flagged_frames.to_string());
                    });
                });
            }
        });

    if let Some(pair) = clicked {
        state.select_pair(pair);
    }
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open report…").clicked() {
                open_file_dialog(state);
                ui.close_menu();
            }
        });

        ui.separator();

        if let Some(path) = &state.report_path {
            let name = path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
            ui.label(RichText::new(name).strong());
        }

        if let Some(report) = &state.report {
            ui.label(format!(
                "Sequence {}: {}/{} frames analyzed, {} skipped, {} pairs flagged",
                report.sequence,
                report.frames_analyzed,
                report.frames_seen,
                report.frames_skipped,
                report.flagged_pairs().count()
            ));
        }

        ui.separator();

        if ui
            .selectable_label(state.show_background, "Background points")
            .clicked()
        {
            state.show_background = !state.show_background;
        }

        if let Some(msg) = &state.status_message {
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialog
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open sequence report")
        .add_filter("Report", &["json"])
        .pick_file();

    if let Some(path) = file {
        open_report(state, path);
    }
}

pub fn open_report(state: &mut AppState, path: PathBuf) {
    match SequenceReport::load(&path) {
        Ok(report) => {
            log::info!(
                "Loaded report for sequence {} with {} pairs",
                report.sequence,
                report.pairs.len()
            );
            state.set_report(report, path);
        }
        Err(e) => {
            log::error!("Failed to load report: {e:#}");
            state.status_message = Some(format!("Error: {e:#}"));
        }
    }
}
