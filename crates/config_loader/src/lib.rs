//! # Config Loader
//!
//! Configuration loading and parsing module.
//!
//! Responsibilities:
//! - Parse TOML/JSON configuration files
//! - Validate configuration legality
//! - Produce a `VisualizationConfig`
//!
//! # Example
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let config = ConfigLoader::load_from_path(Path::new("visualize.toml")).unwrap();
//! println!("Source: {}", config.source.describe());
//! ```

mod parser;
mod validator;

pub use contracts::VisualizationConfig;
pub use parser::ConfigFormat;
pub use validator::validate;

use contracts::VisError;
use std::path::Path;
use tracing::debug;

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a file, format chosen by extension
    /// (.toml / .json).
    ///
    /// # Errors
    /// - File read failure
    /// - Unsupported format
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_path(path: &Path) -> Result<VisualizationConfig, VisError> {
        let format = Self::detect_format(path)?;
        let content = std::fs::read_to_string(path)?;
        debug!(path = %path.display(), ?format, bytes = content.len(), "config read");
        Self::load_from_str(&content, format)
    }

    /// Load configuration from a string
    pub fn load_from_str(
        content: &str,
        format: ConfigFormat,
    ) -> Result<VisualizationConfig, VisError> {
        let config: VisualizationConfig = parser::parse(content, format)?;
        validator::validate(&config)?;
        Ok(config)
    }

    pub fn to_toml(config: &VisualizationConfig) -> Result<String, VisError> {
        toml::to_string_pretty(config)
            .map_err(|e| VisError::config_parse(format!("TOML serialize error: {e}")))
    }

    pub fn to_json(config: &VisualizationConfig) -> Result<String, VisError> {
        serde_json::to_string_pretty(config)
            .map_err(|e| VisError::config_parse(format!("JSON serialize error: {e}")))
    }

    fn detect_format(path: &Path) -> Result<ConfigFormat, VisError> {
        let ext = path.extension().and_then(|e| e.to_str()).ok_or_else(|| {
            VisError::config_parse("cannot determine file format from extension")
        })?;

        ConfigFormat::from_extension(ext)
            .ok_or_else(|| VisError::config_parse(format!("unsupported config format: .{ext}")))
    }
}
