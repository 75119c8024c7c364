use std::path::PathBuf;

use rusty_kitti::color::ClassColors;
use rusty_kitti::data::model::ClassPair;
use rusty_kitti::export::report::{PairReport, SequenceReport};

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
pub struct AppState {
    /// Loaded sequence report (None until user opens a file).
    pub report: Option<SequenceReport>,

    /// Where the report was loaded from.
    pub report_path: Option<PathBuf>,

    /// Class pair shown in the central panel.
    pub selected_pair: Option<ClassPair>,

    /// Colours of the loaded report's classes.
    pub colors: ClassColors,

    /// Draw the grey sample-frame background behind the flagged points.
    pub show_background: bool,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            report: None,
            report_path: None,
            selected_pair: None,
            colors: ClassColors::default(),
            show_background: true,
            status_message: None,
        }
    }
}

impl AppState {
    /// Ingest a newly loaded report and select its highest-scoring pair.
    pub fn set_report(&mut self, report: SequenceReport, path: PathBuf) {
        self.colors = ClassColors::from(report.colors.clone());
        self.selected_pair = report.pairs.first().map(|p| p.pair);
        self.report = Some(report);
        self.report_path = Some(path);
        self.status_message = None;
    }

    pub fn select_pair(&mut self, pair: ClassPair) {
        self.selected_pair = Some(pair);
    }

    /// Report entry of the selected pair.
    pub fn selected(&self) -> Option<&PairReport> {
        let report = self.report.as_ref()?;
        report.pair(self.selected_pair?)
    }
}
