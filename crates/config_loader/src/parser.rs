//! TOML / JSON parsing

use contracts::VisError;
use serde::de::DeserializeOwned;

/// Configuration file format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Json,
}

impl ConfigFormat {
    /// Infer the format from a file extension (case-insensitive)
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

pub fn parse_toml<T: DeserializeOwned>(content: &str) -> Result<T, VisError> {
    toml::from_str(content).map_err(|e| VisError::ConfigParse {
        message: format!("TOML parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

pub fn parse_json<T: DeserializeOwned>(content: &str) -> Result<T, VisError> {
    serde_json::from_str(content).map_err(|e| VisError::ConfigParse {
        message: format!("JSON parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

pub fn parse<T: DeserializeOwned>(content: &str, format: ConfigFormat) -> Result<T, VisError> {
    match format {
        ConfigFormat::Toml => parse_toml(content),
        ConfigFormat::Json => parse_json(content),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{AnalysisConfig, DescriptorKind, SourceConfig, VisualizationConfig};

    #[test]
    fn test_parse_toml_full() {
        let content = r#"
max_wait_ticks = 3
window_capacity = 6

[source]
kind = "image_sequence"
path = "frames/"
fps = 25.0
loop_playback = true

[analysis]
kind = "synthetic"
latency_frames = 2
descriptor = "vector_field"

[render]
viewport_width = 800
viewport_height = 600
snapshot_dir = "out"

[runtime]
tick_interval_ms = 40
max_frames = 100
"#;
        let config: VisualizationConfig = parse_toml(content).unwrap();
        assert_eq!(config.max_wait_ticks, 3);
        assert!(matches!(
            config.source,
            SourceConfig::ImageSequence {
                loop_playback: true,
                ..
            }
        ));
        assert!(matches!(
            config.analysis,
            AnalysisConfig::Synthetic {
                latency_frames: 2,
                descriptor: DescriptorKind::VectorField,
                ..
            }
        ));
        assert_eq!(config.render.viewport_width, 800);
        assert_eq!(config.render.retry_budget, 3);
        assert_eq!(config.runtime.max_frames, 100);
    }

    #[test]
    fn test_parse_json_minimal() {
        let content = r#"{
            "source": { "kind": "device", "index": 0 },
            "analysis": { "kind": "none" }
        }"#;
        let config: VisualizationConfig = parse_json(content).unwrap();
        assert!(matches!(config.source, SourceConfig::Device { index: 0, .. }));
        assert!(matches!(config.analysis, AnalysisConfig::None));
    }

    #[test]
    fn test_parse_toml_syntax_error() {
        let result: Result<VisualizationConfig, _> = parse_toml("invalid toml [[[");
        assert!(matches!(result, Err(VisError::ConfigParse { .. })));
    }

    #[test]
    fn test_unknown_source_kind() {
        let content = r#"
[source]
kind = "webcam"
"#;
        let result: Result<VisualizationConfig, _> = parse_toml(content);
        let err = result.unwrap_err().to_string();
        assert!(err.contains("TOML parse error"), "got: {err}");
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(
            ConfigFormat::from_extension("toml"),
            Some(ConfigFormat::Toml)
        );
        assert_eq!(
            ConfigFormat::from_extension("JSON"),
            Some(ConfigFormat::Json)
        );
        assert_eq!(ConfigFormat::from_extension("yaml"), None);
    }
}
