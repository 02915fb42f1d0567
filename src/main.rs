use anyhow::anyhow;
use clap::Parser;
use eframe::egui;
use env_logger::Env;
use log::info;

use iss_tracker::{App, Config};

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = Config::parse();
    config.validate()?;
    info!(
        "Starting with {:?} backend, observer at ({}, {}), polling every {}s",
        config.backend, config.observer_lat, config.observer_lon, config.poll_interval_secs
    );
    let backend = config.build_backend();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1400.0, 850.0])
            .with_title("ISS Tracker"),
        ..Default::default()
    };

    eframe::run_native(
        "ISS Tracker",
        options,
        Box::new(|cc| Ok(Box::new(App::new(cc, config, backend)))),
    )
    .map_err(|e| anyhow!("eframe exited with an error: {e}"))
}
