//! Generator configuration file support

use std::path::Path;

use serde::Deserialize;
use tracing::warn;

use crate::error::{LtcgenError, Result};

/// Frame rates the generator knows how to time
const SUPPORTED_FPS: [f64; 5] = [23.976, 24.0, 25.0, 29.97, 30.0];

/// System-wide configuration file location
const DEFAULT_CONFIG_PATH: &str = "/etc/ltcgen/ltcgen.toml";

/// Generator configuration loaded from a TOML file.
///
/// Key names are camelCase for compatibility with existing deployments.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GeneratorConfig {
    /// Nominal frame rate
    pub fps: f64,

    /// Drop-frame counting; only meaningful at 29.97 fps
    pub dropframe: bool,

    /// Sample rate override in Hz (0 = use the sink's advertised rate)
    pub samplerate: u32,

    /// Width of the average-rate window, in minutes of frames
    pub rate_window_minutes: f64,

    /// Reserved for future closed-loop offset control
    pub pid: PidConfig,
}

/// Gains for the planned closed-loop offset controller; parsed and carried
/// but not yet consulted by the pump.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PidConfig {
    pub p: f64,
    pub i: f64,
    pub d: f64,
    pub depth: u32,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            fps: 29.97,
            dropframe: true,
            samplerate: 0,
            rate_window_minutes: 2.0,
            pid: PidConfig::default(),
        }
    }
}

impl Default for PidConfig {
    fn default() -> Self {
        Self { p: 1.0, i: 1.0, d: 1.0, depth: 30 }
    }
}

impl GeneratorConfig {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            LtcgenError::InvalidConfig(format!(
                "failed to read config file '{}': {e}",
                path.as_ref().display()
            ))
        })?;

        toml::from_str(&content).map_err(|e| {
            LtcgenError::InvalidConfig(format!(
                "failed to parse config file '{}': {e}",
                path.as_ref().display()
            ))
        })
    }

    /// Load from the system-wide location, falling back to defaults when no
    /// file is present
    pub fn load_default() -> Result<Self> {
        let path = Path::new(DEFAULT_CONFIG_PATH);
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Coerce incompatible settings and reject unknown frame rates.
    ///
    /// Drop-frame only exists at 29.97; the frame rate is overridden with a
    /// warning when the pair is incompatible, matching the generator's
    /// long-standing behavior.
    pub fn normalize(&mut self) -> Result<()> {
        if self.dropframe && self.fps != 29.97 {
            warn!(
                "dropframe is not supported at {} fps, overriding fps to 29.97",
                self.fps
            );
            self.fps = 29.97;
        }

        if !SUPPORTED_FPS.contains(&self.fps) {
            return Err(LtcgenError::InvalidConfig(format!(
                "unsupported frame rate: {} (expected one of 23.976, 24, 25, 29.97, 30)",
                self.fps
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = GeneratorConfig::default();
        assert_eq!(config.fps, 29.97);
        assert!(config.dropframe);
        assert_eq!(config.samplerate, 0);
        assert_eq!(config.rate_window_minutes, 2.0);
        assert_eq!(config.pid.depth, 30);
    }

    #[test]
    fn parses_camel_case_keys() {
        let config: GeneratorConfig = toml::from_str(
            r#"
            fps = 25.0
            dropframe = false
            samplerate = 48000
            rateWindowMinutes = 1.5

            [pid]
            p = 2.0
            depth = 10
            "#,
        )
        .unwrap();

        assert_eq!(config.fps, 25.0);
        assert!(!config.dropframe);
        assert_eq!(config.samplerate, 48_000);
        assert_eq!(config.rate_window_minutes, 1.5);
        assert_eq!(config.pid.p, 2.0);
        assert_eq!(config.pid.i, 1.0);
        assert_eq!(config.pid.depth, 10);
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let config: GeneratorConfig = toml::from_str("fps = 30.0\ndropframe = false\n").unwrap();
        assert_eq!(config.fps, 30.0);
        assert_eq!(config.samplerate, 0);
        assert_eq!(config.rate_window_minutes, 2.0);
    }

    #[test]
    fn normalize_coerces_incompatible_dropframe() {
        let mut config = GeneratorConfig { fps: 25.0, dropframe: true, ..Default::default() };
        config.normalize().unwrap();
        assert_eq!(config.fps, 29.97);
        assert!(config.dropframe);
    }

    #[test]
    fn normalize_rejects_unknown_rates() {
        let mut config = GeneratorConfig { fps: 48.0, dropframe: false, ..Default::default() };
        assert!(config.normalize().is_err());
    }
}
