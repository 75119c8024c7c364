mod app;
mod state;
mod ui;

use app::RustyKittiApp;
use eframe::egui;

fn main() -> eframe::Result {
    env_logger::init();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1400.0, 900.0])
            .with_min_inner_size([700.0, 450.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Rusty Kitti – Class Anomaly Viewer",
        options,
        Box::new(|_cc| {
            let mut app = RustyKittiApp::default();
            // a report path may be passed on the command line
            if let Some(path) = std::env::args_os().nth(1) {
                ui::panels::open_report(&mut app.state, path.into());
            }
            Ok(Box::new(app))
        }),
    )
}
