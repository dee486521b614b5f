use std::path::PathBuf;
use std::sync::mpsc;
use std::time::Duration;

use egui::{ColorImage, TextureHandle};
use egui_extras::{Column, TableBuilder};

use crate::config;
use crate::core::downloader;
use crate::models::Track;
use crate::sources::netease::NeteaseClient;
use crate::sources::MusicSource;

/// Covers are scaled to fit this box, preserving aspect ratio.
const COVER_SIZE: f32 = 150.0;

enum BgResult {
    SearchDone(Vec<Track>),
    SearchFailed(String),
    CoverDone(usize, String, Vec<u8>),
    DownloadDone(PathBuf),
    DownloadFailed(String),
}

/// A cover arriving from a background fetch is installed only while row
/// `index` still shows the track it was fetched for; covers spawned for an
/// earlier search are dropped once a newer search has replaced the table.
fn cover_is_current(tracks: &[Track], index: usize, cover_url: &str) -> bool {
    tracks.get(index).is_some_and(|t| t.cover_url == cover_url)
}

pub struct PastKingApp {
    // Search
    search_query: String,
    tracks: Vec<Track>,
    cover_textures: Vec<Option<TextureHandle>>,

    // Download settings
    output_dir: PathBuf,
    endpoint: String,

    // Background tasks
    tx: mpsc::Sender<BgResult>,
    rx: mpsc::Receiver<BgResult>,
    is_loading: bool,
    status_msg: String,
}

impl PastKingApp {
    pub fn new(cc: &eframe::CreationContext<'_>) -> Self {
        Self::setup_cjk_fonts(&cc.egui_ctx);
        let (tx, rx) = mpsc::channel();

        let cfg = config::load_config();

        Self {
            search_query: String::new(),
            tracks: Vec::new(),
            cover_textures: Vec::new(),
            output_dir: cfg.download.resolve_output_dir(),
            endpoint: cfg.download.resolve_endpoint(),
            tx,
            rx,
            is_loading: false,
            status_msg: String::new(),
        }
    }

    fn setup_cjk_fonts(ctx: &egui::Context) {
        let mut fonts = egui::FontDefinitions::default();

        // Catalog titles are routinely CJK; egui's bundled fonts are not.
        let font_paths = [
            // macOS
            "/System/Library/Fonts/PingFang.ttc",
            "/System/Library/Fonts/STHeiti Light.ttc",
            // Linux
            "/usr/share/fonts/truetype/noto/NotoSansCJK-Regular.ttc",
            "/usr/share/fonts/opentype/noto/NotoSansCJK-Regular.ttc",
            "/usr/share/fonts/noto-cjk/NotoSansCJK-Regular.ttc",
        ];

        for path in &font_paths {
            if let Ok(font_data) = std::fs::read(path) {
                fonts.font_data.insert(
                    "cjk_font".to_string(),
                    egui::FontData::from_owned(font_data),
                );

                if let Some(family) = fonts
                    .families
                    .get_mut(&egui::FontFamily::Proportional)
                {
                    family.push("cjk_font".to_string());
                }
                if let Some(family) = fonts
                    .families
                    .get_mut(&egui::FontFamily::Monospace)
                {
                    family.push("cjk_font".to_string());
                }

                ctx.set_fonts(fonts);
                return;
            }
        }
    }

    fn start_search(&mut self) {
        // Empty keyword is a no-op, not an error.
        let query = self.search_query.trim().to_string();
        if query.is_empty() {
            return;
        }

        let endpoint = self.endpoint.clone();
        let tx = self.tx.clone();
        self.is_loading = true;
        self.status_msg = format!("Searching \"{}\"...", query);

        std::thread::spawn(move || {
            let result = (|| -> anyhow::Result<Vec<Track>> {
                let client = NeteaseClient::new(&endpoint)?;
                client.search(&query)
            })();

            match result {
                Ok(tracks) => {
                    let _ = tx.send(BgResult::SearchDone(tracks));
                }
                Err(e) => {
                    log::warn!("search failed: {:#}", e);
                    let _ = tx.send(BgResult::SearchFailed("Search failed".to_string()));
                }
            }
        });
    }

    fn fetch_cover(&self, index: usize, track: &Track) {
        if track.cover_url.is_empty() {
            return;
        }

        let endpoint = self.endpoint.clone();
        let track = track.clone();
        let tx = self.tx.clone();

        std::thread::spawn(move || {
            let result = (|| -> anyhow::Result<Vec<u8>> {
                let client = NeteaseClient::new(&endpoint)?;
                client.fetch_cover(&track)
            })();

            match result {
                Ok(data) => {
                    let _ = tx.send(BgResult::CoverDone(index, track.cover_url.clone(), data));
                }
                Err(e) => {
                    // Cover failures stay a blank placeholder, never an error state.
                    log::warn!("cover fetch failed for {}: {:#}", track.summary(), e);
                }
            }
        });
    }

    fn start_download(&mut self, index: usize) {
        let Some(track) = self.tracks.get(index).cloned() else {
            return;
        };
        if !track.is_downloadable() {
            self.status_msg = "This track has no audio URL.".to_string();
            return;
        }

        let endpoint = self.endpoint.clone();
        let out_dir = self.output_dir.clone();
        let tx = self.tx.clone();
        self.status_msg = format!("Downloading {}...", track.summary());

        std::thread::spawn(move || {
            let result = (|| -> anyhow::Result<Option<PathBuf>> {
                let client = NeteaseClient::new(&endpoint)?;
                downloader::download_track(&client, &track, &out_dir)
            })();

            match result {
                Ok(Some(path)) => {
                    let _ = tx.send(BgResult::DownloadDone(path));
                }
                Ok(None) => {}
                Err(e) => {
                    log::warn!("download failed: {:#}", e);
                    let _ = tx.send(BgResult::DownloadFailed(format!(
                        "Download failed: {}",
                        track.summary()
                    )));
                }
            }
        });
    }

    fn process_bg_results(&mut self, ctx: &egui::Context) {
        while let Ok(result) = self.rx.try_recv() {
            match result {
                // Results replace whatever is showing; overlapping searches
                // are last-writer-wins.
                BgResult::SearchDone(tracks) => {
                    for (i, track) in tracks.iter().enumerate() {
                        self.fetch_cover(i, track);
                    }
                    self.cover_textures = vec![None; tracks.len()];
                    self.tracks = tracks;
                    self.is_loading = false;
                    self.status_msg = format!("{} results", self.tracks.len());
                }
                BgResult::SearchFailed(msg) => {
                    self.tracks.clear();
                    self.cover_textures.clear();
                    self.is_loading = false;
                    self.status_msg = msg;
                }
                BgResult::CoverDone(index, cover_url, data) => {
                    if !cover_is_current(&self.tracks, index, &cover_url) {
                        continue;
                    }
                    if let Ok(img) = image::load_from_memory(&data) {
                        let rgba = img.to_rgba8();
                        let size = [rgba.width() as usize, rgba.height() as usize];
                        let pixels = rgba.into_raw();
                        let color_image =
                            ColorImage::from_rgba_unmultiplied(size, &pixels);
                        let texture = ctx.load_texture(
                            format!("cover_{}", index),
                            color_image,
                            Default::default(),
                        );
                        if let Some(slot) = self.cover_textures.get_mut(index) {
                            *slot = Some(texture);
                        }
                    } else {
                        log::warn!("cover image decode failed for row {}", index);
                    }
                }
                BgResult::DownloadDone(path) => {
                    self.status_msg = format!("Saved {}", path.display());
                }
                BgResult::DownloadFailed(msg) => {
                    self.status_msg = msg;
                }
            }
        }
    }

    fn show_results_table(&self, ui: &mut egui::Ui) -> Option<usize> {
        let mut download_idx = None;

        TableBuilder::new(ui)
            .striped(true)
            .column(Column::auto())
            .column(Column::remainder())
            .column(Column::remainder())
            .column(Column::exact(COVER_SIZE + 10.0))
            .column(Column::auto())
            .header(24.0, |mut header| {
                header.col(|ui| {
                    ui.strong("ID");
                });
                header.col(|ui| {
                    ui.strong("Title");
                });
                header.col(|ui| {
                    ui.strong("Artist");
                });
                header.col(|ui| {
                    ui.strong("Cover");
                });
                header.col(|ui| {
                    ui.strong("Download");
                });
            })
            .body(|mut body| {
                for (i, track) in self.tracks.iter().enumerate() {
                    body.row(COVER_SIZE + 10.0, |mut row| {
                        row.col(|ui| {
                            ui.label(&track.id);
                        });
                        row.col(|ui| {
                            ui.label(&track.title);
                        });
                        row.col(|ui| {
                            ui.label(&track.artist);
                        });
                        row.col(|ui| {
                            if let Some(Some(texture)) = self.cover_textures.get(i) {
                                let size = texture.size_vec2();
                                let scale = (COVER_SIZE / size.x)
                                    .min(COVER_SIZE / size.y)
                                    .min(1.0);
                                ui.image(egui::load::SizedTexture::new(
                                    texture.id(),
                                    size * scale,
                                ));
                            } else {
                                ui.allocate_space(egui::vec2(COVER_SIZE, COVER_SIZE));
                            }
                        });
                        row.col(|ui| {
                            let button = egui::Button::new("Download");
                            if ui.add_enabled(track.is_downloadable(), button).clicked() {
                                download_idx = Some(i);
                            }
                        });
                    });
                }
            });

        download_idx
    }
}

impl eframe::App for PastKingApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.process_bg_results(ctx);

        if self.is_loading {
            ctx.request_repaint_after(Duration::from_millis(100));
        }

        // Top panel: keyword input
        egui::TopBottomPanel::top("top_panel").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label("Song name:");
                let response = ui.text_edit_singleline(&mut self.search_query);
                if ui.button("Search").clicked()
                    || (response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)))
                {
                    self.start_search();
                }
                if self.is_loading {
                    ui.spinner();
                }
                ui.label(&self.status_msg);
            });
        });

        // Central panel: results table
        egui::CentralPanel::default().show(ctx, |ui| {
            if self.tracks.is_empty() {
                ui.centered_and_justified(|ui| {
                    ui.label("Enter a song name and press Search");
                });
                return;
            }

            let download_idx = self.show_results_table(ui);
            if let Some(idx) = download_idx {
                self.start_download(idx);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(cover_url: &str) -> Track {
        Track {
            cover_url: cover_url.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_cover_installs_on_matching_row() {
        let tracks = vec![track("http://img/a.jpg"), track("http://img/b.jpg")];
        assert!(cover_is_current(&tracks, 1, "http://img/b.jpg"));
    }

    #[test]
    fn test_cover_from_replaced_search_is_dropped() {
        // A cover fetch spawned for an earlier search finishes after a newer
        // search has replaced the table; its row index is in range but now
        // shows a different track.
        let newer = vec![track("http://img/x.jpg"), track("http://img/y.jpg")];
        assert!(!cover_is_current(&newer, 1, "http://img/b.jpg"));
    }

    #[test]
    fn test_cover_for_vanished_row_is_dropped() {
        let newer = vec![track("http://img/x.jpg")];
        assert!(!cover_is_current(&newer, 4, "http://img/x.jpg"));
    }
}
