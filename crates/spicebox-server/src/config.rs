//! Server configuration.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use spicebox_core::SimulationOptions;

use crate::error::ConfigError;
use crate::plot::ImageFormat;

/// Settings read from an optional JSON file and overridden on the command line.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Library directories indexed at startup.
    pub library_paths: Vec<PathBuf>,
    /// Image format for plotting tools that do not name one.
    pub default_image_format: ImageFormat,
    pub plot_width: u32,
    pub plot_height: u32,
    /// Nominal circuit temperature in °C.
    pub temperature: f64,
    pub gmin: f64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        let options = SimulationOptions::default();
        Self {
            library_paths: Vec::new(),
            default_image_format: ImageFormat::Png,
            plot_width: 800,
            plot_height: 600,
            temperature: options.temperature,
            gmin: options.gmin,
        }
    }
}

impl ServerConfig {
    /// Read a JSON config file. Missing keys take their defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let size_ok = |v: u32| (64..=4096).contains(&v);
        if !size_ok(self.plot_width) || !size_ok(self.plot_height) {
            return Err(ConfigError::Invalid(format!(
                "plot size must be between 64 and 4096 pixels per side, got {}x{}",
                self.plot_width, self.plot_height
            )));
        }
        if !(self.gmin.is_finite() && self.gmin >= 0.0) {
            return Err(ConfigError::Invalid(format!("gmin must be non-negative, got {}", self.gmin)));
        }
        if !self.temperature.is_finite() {
            return Err(ConfigError::Invalid("temperature must be finite".to_string()));
        }
        Ok(())
    }

    /// Engine options for a run at the configured temperature.
    pub fn simulation_options(&self) -> SimulationOptions {
        SimulationOptions {
            temperature: self.temperature,
            gmin: self.gmin,
        }
    }
}
