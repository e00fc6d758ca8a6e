mod arbitrage;
mod fetch;
mod items;
mod model;
mod normalize;
mod store;
mod ui;

use eframe::egui;
use tracing_subscriber::EnvFilter;
use ui::AlbionApp;

fn main() -> eframe::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1500.0, 950.0])
            .with_min_inner_size([1100.0, 650.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Albion Market Arbitrage Analyzer",
        options,
        Box::new(|cc| {
            ui::set_custom_style(&cc.egui_ctx);
            Ok(Box::new(AlbionApp::new()))
        }),
    )
}
