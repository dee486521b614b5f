#[cfg(feature = "gui")]
mod app;

#[cfg(feature = "gui")]
pub fn launch() {
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([800.0, 600.0]),
        ..Default::default()
    };

    let _ = eframe::run_native(
        "PastKing Music Downloader",
        options,
        Box::new(move |cc| Ok(Box::new(app::PastKingApp::new(cc)))),
    );
}
