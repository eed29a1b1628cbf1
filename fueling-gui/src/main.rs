mod app;

use anyhow::{Context, Result};
use clap::Parser;
use eframe::egui;
use std::path::PathBuf;

use fueling_core::{resolve_data_dir, App, Settings, ViewMode};

use crate::app::FuelingApp;

#[derive(Parser, Debug)]
#[clap(author, version, about = "Desktop front end for fueling requests")]
struct Args {
    /// Data directory holding the request store (must exist)
    #[clap(long)]
    data_dir: Option<PathBuf>,

    /// Which side to act as: client (requester) or company (operator)
    #[clap(long)]
    view: Option<String>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = Args::parse();
    let settings = Settings::load();

    let mode = match &args.view {
        Some(view) => ViewMode::from_param(view),
        None => settings.default_view.unwrap_or_default(),
    };

    let explicit_dir = args.data_dir.as_deref().or(settings.data_dir.as_deref());
    let data_dir = resolve_data_dir(explicit_dir)?;
    let app = App::mount(&data_dir, mode, settings.timing())
        .with_context(|| format!("Failed to start in {:?}", data_dir))?;

    let title = format!("Fueling Requests ({})", mode);
    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title(title.as_str())
            .with_inner_size([1100.0, 760.0])
            .with_min_inner_size([720.0, 480.0]),
        ..Default::default()
    };

    let result = eframe::run_native(
        &title,
        native_options,
        Box::new(move |_cc| Ok(Box::new(FuelingApp::new(app)))),
    );

    match result {
        Ok(()) => {
            log::info!("Application exited normally");
            Ok(())
        }
        Err(e) => {
            log::error!("Application error: {}", e);
            Err(anyhow::anyhow!("eframe error: {}", e))
        }
    }
}
