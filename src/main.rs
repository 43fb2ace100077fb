//! ltcgen - SMPTE linear timecode generator CLI

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use crossbeam_channel::bounded;
use tracing::info;
use tracing_subscriber::EnvFilter;

use ltcgen::audio::{output_devices, CpalSink, FramePump, SampleSink};
use ltcgen::config::{Args, Command, GeneratorConfig};

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    init_logging(&args)?;

    // Execute command
    match args.command.unwrap_or_default() {
        Command::List => cmd_list(),
        Command::Start {
            config,
            fps,
            dropframe,
            samplerate,
            device,
        } => cmd_start(config, fps, dropframe, samplerate, device),
    }
}

fn init_logging(args: &Args) -> Result<()> {
    let level = args.log_level();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.to_string()));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    if let Some(log_file) = &args.log {
        let file = std::fs::File::create(log_file)?;
        subscriber.with_writer(file).init();
    } else {
        subscriber.init();
    }

    Ok(())
}

/// List available audio output devices
fn cmd_list() -> Result<()> {
    let devices = output_devices()?;

    if devices.is_empty() {
        println!("No audio output devices found.");
        return Ok(());
    }

    println!("Available audio output devices:\n");

    for (i, device) in devices.iter().enumerate() {
        let default_tag = if device.is_default { " (default)" } else { "" };
        println!("  {}. {}{}", i + 1, device.name, default_tag);
    }

    println!();
    Ok(())
}

/// Start generating timecode
fn cmd_start(
    config_path: Option<PathBuf>,
    fps: Option<f64>,
    dropframe: Option<bool>,
    samplerate: Option<u32>,
    device: Option<String>,
) -> Result<()> {
    let mut config = match config_path {
        Some(path) => GeneratorConfig::load(path)?,
        None => GeneratorConfig::load_default()?,
    };

    // CLI flags override the configuration file
    if let Some(fps) = fps {
        config.fps = fps;
    }
    if let Some(dropframe) = dropframe {
        config.dropframe = dropframe;
    }
    if let Some(samplerate) = samplerate {
        config.samplerate = samplerate;
    }
    config.normalize()?;

    info!("opening audio device");
    let mut sink = CpalSink::open(device.as_deref(), config.samplerate)?;
    info!("device configuration -- {}", sink.config());

    // Forward the interrupt signal into the pump's shutdown channel
    let (shutdown_tx, shutdown_rx) = bounded(1);
    ctrlc::set_handler(move || {
        let _ = shutdown_tx.try_send(());
    })?;

    FramePump::new(&config).run(&mut sink, shutdown_rx)?;

    info!("exiting");
    Ok(())
}
