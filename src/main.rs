//! Lumen - headless playground for the frame scheduler
//!
//! Runs the demo scene for a configured number of frames and prints a summary.
//! Usage: `lumen [settings.toml]` or `lumen --write-defaults`. Log output is
//! controlled with `RUST_LOG`.

mod playground;
mod settings;

use std::ffi::OsString;
use std::path::PathBuf;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use settings::PlaygroundSettings;

fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting Lumen playground...");

    let path = match parse_args(std::env::args_os().skip(1)) {
        Command::Run(path) => path,
        Command::WriteDefaults => {
            PlaygroundSettings::default().save()?;
            return Ok(());
        }
    };
    let settings = PlaygroundSettings::load(path.as_deref());
    info!(
        frames = settings.run.frames,
        policy = ?settings.scheduler.fixed_step_policy,
        fixed_timestep = settings.scheduler.fixed_timestep,
        "Running playground"
    );

    let report = playground::run(&settings)?;
    info!(
        frames = report.frames,
        simulated = report.total_time,
        peak_entities = report.peak_entities,
        remaining_entities = report.remaining_entities,
        world_commands = report.world_commands,
        gui_commands = report.gui_commands,
        active_systems = ?report.active_systems,
        "Playground finished"
    );
    Ok(())
}

#[derive(Debug, PartialEq)]
enum Command {
    /// Run with settings from the given file, or the default location
    Run(Option<PathBuf>),
    /// Write the default settings file and exit
    WriteDefaults,
}

fn parse_args(mut args: impl Iterator<Item = OsString>) -> Command {
    match args.next() {
        Some(arg) if arg == "--write-defaults" => Command::WriteDefaults,
        arg => Command::Run(arg.map(PathBuf::from)),
    }
}
