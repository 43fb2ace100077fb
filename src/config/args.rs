//! CLI argument parsing using clap

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// ltcgen - SMPTE linear timecode generator
///
/// Generate LTC audio in lockstep with the system clock and stream it to an
/// audio output device
#[derive(Parser, Debug)]
#[command(name = "ltcgen")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Verbose output (can be repeated for more verbosity)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode - only show errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Log output to file
    #[arg(long, global = true)]
    pub log: Option<String>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// List available audio output devices
    List,

    /// Generate timecode and stream it to an output device
    Start {
        /// Path to a TOML configuration file
        /// (default: /etc/ltcgen/ltcgen.toml when present)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Nominal frame rate: 23.976, 24, 25, 29.97 or 30
        #[arg(long)]
        fps: Option<f64>,

        /// Enable or disable drop-frame counting (29.97 only)
        #[arg(long)]
        dropframe: Option<bool>,

        /// Override the device sample rate in Hz (0 = device default)
        #[arg(long)]
        samplerate: Option<u32>,

        /// Output device name substring
        /// If not specified, the system default output is used
        #[arg(short, long)]
        device: Option<String>,
    },
}

impl Args {
    /// Get the log level based on verbose/quiet flags
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else {
            match self.verbose {
                0 => tracing::Level::INFO,
                1 => tracing::Level::DEBUG,
                _ => tracing::Level::TRACE,
            }
        }
    }
}

impl Default for Command {
    fn default() -> Self {
        // Default to generating on the default output device
        Command::Start {
            config: None,
            fps: None,
            dropframe: None,
            samplerate: None,
            device: None,
        }
    }
}
