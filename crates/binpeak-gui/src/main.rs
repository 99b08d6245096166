use binpeak_lib::config::ChannelConfig;
use binpeak_lib::io::binary::IngestNotice;
use binpeak_lib::plot::{Color, Figure, MarkerShape, Series};
use eframe::{egui, egui::ViewportBuilder};
use egui_plot::{Legend, Line, LineStyle, Plot, Points};
use log::{error, warn};
use rfd::FileDialog;
use std::path::PathBuf;

mod store;

use store::Store;

const CONFIG_ENV: &str = "BINPEAK_CONFIG";

fn main() -> eframe::Result<()> {
    env_logger::init();
    let cfg = load_config();
    let native_options = eframe::NativeOptions {
        viewport: ViewportBuilder::default().with_inner_size([1100.0, 760.0]),
        ..Default::default()
    };
    eframe::run_native(
        "binpeak",
        native_options,
        Box::new(|_cc| Ok(Box::new(BinpeakApp::new(cfg)))),
    )
}

fn load_config() -> ChannelConfig {
    match std::env::var_os(CONFIG_ENV) {
        Some(path) => {
            let path = PathBuf::from(path);
            ChannelConfig::load(&path).unwrap_or_else(|err| {
                error!("{}; falling back to defaults", err);
                ChannelConfig::default()
            })
        }
        None => ChannelConfig::default(),
    }
}

struct BinpeakApp {
    store: Store,
    uploaded: usize,
}

impl BinpeakApp {
    fn new(cfg: ChannelConfig) -> Self {
        Self {
            store: Store::new(cfg),
            uploaded: 0,
        }
    }

    fn upload_dialog(&mut self) {
        let Some(paths) = FileDialog::new()
            .add_filter("BIN files", &["bin"])
            .pick_files()
        else {
            return;
        };
        let mut uploads = Vec::with_capacity(paths.len());
        let mut unreadable = Vec::new();
        for path in &paths {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| path.display().to_string());
            match std::fs::read(path) {
                Ok(bytes) => uploads.push((name, bytes)),
                Err(err) => {
                    warn!("failed to read {}: {}", path.display(), err);
                    unreadable.push(IngestNotice::Failed {
                        file: name,
                        error: err.to_string(),
                    });
                }
            }
        }
        self.uploaded = paths.len();
        self.store.load_uploads(uploads);
        for notice in unreadable {
            self.store.push_notice(notice);
        }
    }

    fn show_controls(&mut self, ctx: &egui::Context) {
        egui::SidePanel::left("controls").show(ctx, |ui| {
            ui.heading("Files");
            if self.uploaded == 0 {
                ui.label("Please upload one or more files.");
                return;
            }
            ui.colored_label(
                egui::Color32::DARK_GREEN,
                format!("{} file(s) uploaded.", self.uploaded),
            );
            egui::ScrollArea::vertical()
                .max_height(200.0)
                .show(ui, |ui| {
                    for notice in self.store.notices() {
                        ui.label(notice.processing());
                        match notice {
                            IngestNotice::Decoded { .. } => {
                                ui.monospace(notice.message());
                            }
                            IngestNotice::Unsupported { .. } => {
                                ui.colored_label(egui::Color32::GOLD, notice.message());
                            }
                            IngestNotice::Failed { .. } => {
                                ui.colored_label(egui::Color32::LIGHT_RED, notice.message());
                            }
                        }
                    }
                });

            ui.separator();
            ui.heading("Overlay legend");
            let names: Vec<String> = self
                .store
                .channels()
                .names()
                .into_iter()
                .map(str::to_string)
                .collect();
            for name in names {
                let mut visible = self.store.is_visible(&name);
                if ui.checkbox(&mut visible, name.as_str()).changed() {
                    self.store.set_visible(&name, visible);
                }
            }

            if let Some(det) = self.store.detection() {
                ui.separator();
                ui.label(format!("Threshold: {:.2}", det.threshold));
                ui.label(format!("Peaks: {}", det.peak_count()));
            }
        });
    }

    fn show_charts(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            if self.store.channels().is_empty() {
                ui.centered_and_justified(|ui| {
                    ui.label("Please upload one or more files.");
                });
                return;
            }

            egui::ScrollArea::vertical().show(ui, |ui| {
                let reference = self.store.reference().to_string();
                match self.store.overlay_figure() {
                    Some(fig) => {
                        ui.heading("Overlayed Graph of All Files");
                        Plot::new("overlay_plot")
                            .height(420.0)
                            .legend(Legend::default())
                            .x_axis_label(axis_label(&fig.x.label))
                            .y_axis_label(axis_label(&fig.y.label))
                            .show(ui, |plot_ui| plot_figure(plot_ui, fig));
                    }
                    None => {
                        ui.colored_label(
                            egui::Color32::LIGHT_RED,
                            format!("No {} found ! ", reference),
                        );
                    }
                }

                ui.separator();
                ui.heading("Select individual graph to display");
                let names: Vec<String> = self
                    .store
                    .channels()
                    .names()
                    .into_iter()
                    .map(str::to_string)
                    .collect();
                let mut selected = self.store.selected().unwrap_or_default().to_string();
                egui::ComboBox::from_label("Choose a file")
                    .selected_text(selected.clone())
                    .show_ui(ui, |ui| {
                        for name in &names {
                            ui.selectable_value(&mut selected, name.clone(), name.as_str());
                        }
                    });
                self.store.select(&selected);

                if let Some(fig) = self.store.single_figure() {
                    Plot::new("single_plot")
                        .height(420.0)
                        .x_axis_label(axis_label(&fig.x.label))
                        .y_axis_label(axis_label(&fig.y.label))
                        .show(ui, |plot_ui| plot_figure(plot_ui, fig));
                }
            });
        });
    }
}

impl eframe::App for BinpeakApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        egui::TopBottomPanel::top("top").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.heading("Upload BIN files");
                if ui.button("Browse files…").clicked() {
                    self.upload_dialog();
                }
            });
        });
        self.show_controls(ctx);
        self.show_charts(ctx);
    }
}

fn axis_label(label: &Option<String>) -> String {
    label.clone().unwrap_or_default()
}

fn plot_figure(plot_ui: &mut egui_plot::PlotUi, figure: &Figure) {
    for series in figure.series.iter().filter(|s| s.is_visible()) {
        match series {
            Series::Line(line) => {
                let mut plot_line = Line::new(line.points.clone())
                    .color(color32(line.style.color))
                    .width(line.style.width)
                    .name(line.name.clone());
                if let Some([dash, _]) = line.style.dash {
                    plot_line = plot_line.style(LineStyle::Dashed { length: dash });
                }
                plot_ui.line(plot_line);
            }
            Series::Markers(markers) => {
                plot_ui.points(
                    Points::new(markers.points.clone())
                        .shape(marker_shape(markers.shape))
                        .radius(markers.size * 0.5)
                        .filled(true)
                        .color(color32(markers.color))
                        .name(markers.name.clone()),
                );
            }
        }
    }
}

fn marker_shape(shape: MarkerShape) -> egui_plot::MarkerShape {
    match shape {
        MarkerShape::TriangleUp => egui_plot::MarkerShape::Up,
        MarkerShape::TriangleDown => egui_plot::MarkerShape::Down,
        MarkerShape::Circle => egui_plot::MarkerShape::Circle,
    }
}

fn color32(color: Color) -> egui::Color32 {
    let (r, g, b) = color.rgb();
    egui::Color32::from_rgb(r, g, b)
}
