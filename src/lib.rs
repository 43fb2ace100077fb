//! ltcgen - SMPTE linear timecode generator
//!
//! This library generates SMPTE Linear Timecode (LTC) audio in lockstep with
//! the system clock: a frame pump derives a timecode from the wall clock,
//! packs it into the 80-bit LTC layout, renders it as a biphase-mark signal
//! and streams the samples to an audio output device.
//!
//! # Example
//!
//! ```no_run
//! use crossbeam_channel::bounded;
//! use ltcgen::audio::{CpalSink, FramePump};
//! use ltcgen::config::GeneratorConfig;
//!
//! let mut config = GeneratorConfig::default();
//! config.normalize().expect("invalid configuration");
//!
//! let mut sink = CpalSink::open(None, config.samplerate).expect("failed to open device");
//! let (_shutdown_tx, shutdown_rx) = bounded(1);
//!
//! FramePump::new(&config)
//!     .run(&mut sink, shutdown_rx)
//!     .expect("generator failed");
//! ```

pub mod audio;
pub mod config;
pub mod error;
pub mod ltc;
pub mod stats;

pub use error::{LtcgenError, Result};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
