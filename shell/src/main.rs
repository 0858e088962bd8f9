mod background;
mod cli;
mod compositor;
mod config;
mod context;
mod host;
mod input;
mod ipc_server;
mod lifecycle;
mod macros;
mod seek;
mod spawn;
mod surface;
mod video;
mod widget;
mod zoom;

use anyhow::Result;
use clap::Parser;
use std::process::ExitCode;
use std::time::Instant;

use crate::background::BackgroundLoader;
use crate::cli::Cli;
use crate::config::Config;
use crate::context::WindowContext;
use crate::widget::HeadlessTerminal;

fn log_config(config: &Config) {
    log::info!("  General settings:");
    log::info!("    - Log level: {}", config.general.log_level);
    log::info!("    - Title: {}", config.general.title);
    log::info!(
        "    - Font: {} (scale {})",
        config.general.font.as_deref().unwrap_or("default"),
        config.general.font_scale
    );
    log::info!(
        "    - Hold: {}",
        if config.general.hold { "yes" } else { "no" }
    );

    match config.background_path() {
        Some(path) => {
            log::info!("  Background settings:");
            log::info!("    - Path: {}", path.display());
            log::info!("    - Overlay: {}", config.background.overlay_color);
            log::info!(
                "    - Autoscale: {}",
                if config.background.autoscale { "yes" } else { "no" }
            );
        }
        None => log::info!("  Background: not configured"),
    }

    log::info!(
        "  Video: {} fps target, {}ms max step, {}s seek step",
        config.video.target_fps,
        config.video.max_frame_interval_ms,
        config.video.seek_step_secs
    );
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load_from_path(path)?,
        None => Config::load()?,
    };
    cli.apply(&mut config)?;
    config.validate()?;

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.general.log_level.as_str()),
    )
    .init();

    log::info!("Starting vesper v{}", env!("CARGO_PKG_VERSION"));
    log_config(&config);

    let widget = HeadlessTerminal::new(config.window.width, config.window.height);
    let mut ctx = WindowContext::new(config, widget)?;
    log::info!("Window \"{}\" ready", ctx.config().general.title);

    let loader = BackgroundLoader::new(&ctx.config().video);
    ctx.init(&loader, Instant::now());

    let status = host::run(ctx, cli.exec).await?;
    log::info!("Window closed");
    Ok(status)
}
