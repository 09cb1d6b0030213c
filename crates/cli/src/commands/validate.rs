//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::{AnalysisConfig, VisualizationConfig};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    source: String,
    fps: f64,
    analysis: String,
    max_wait_ticks: u64,
    window_capacity: usize,
    viewport: String,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(config) => {
            let warnings = collect_warnings(&config);
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: (!warnings.is_empty()).then_some(warnings),
                summary: Some(ConfigSummary {
                    source: config.source.describe(),
                    fps: config.source.fps(),
                    analysis: analysis_label(&config.analysis).to_string(),
                    max_wait_ticks: config.max_wait_ticks,
                    window_capacity: config.window_capacity,
                    viewport: format!(
                        "{}x{}",
                        config.render.viewport_width, config.render.viewport_height
                    ),
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

pub(crate) fn analysis_label(analysis: &AnalysisConfig) -> &'static str {
    match analysis {
        AnalysisConfig::Synthetic { .. } => "synthetic",
        AnalysisConfig::Replay { .. } => "replay",
        AnalysisConfig::None => "none",
    }
}

/// Non-fatal configuration issues
fn collect_warnings(config: &VisualizationConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    // one frame per tick: a frame can wait max_wait_ticks while newer ones queue behind it
    let needed = config.max_wait_ticks.saturating_add(1);
    if (config.window_capacity as u64) < needed {
        warnings.push(format!(
            "window_capacity ({}) < max_wait_ticks + 1 ({}) - slow results will cause evictions",
            config.window_capacity, needed
        ));
    }

    if matches!(config.analysis, AnalysisConfig::None) {
        warnings.push(
            "analysis is disabled - every frame is presented unannotated after max_wait_ticks"
                .to_string(),
        );
    }

    if config.render.snapshot_dir.is_none() {
        warnings.push("render.snapshot_dir is not set - presented frames are not saved".to_string());
    }

    if config.runtime.tick_interval_ms == 0 {
        warnings.push("runtime.tick_interval_ms is 0 - the loop will spin".to_string());
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Source: {} @ {} fps", summary.source, summary.fps);
            println!("  Analysis: {}", summary.analysis);
            println!("  Max wait (ticks): {}", summary.max_wait_ticks);
            println!("  Window capacity: {}", summary.window_capacity);
            println!("  Viewport: {}", summary.viewport);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn args(path: PathBuf) -> ValidateArgs {
        ValidateArgs {
            config: path,
            json: true,
        }
    }

    #[test]
    fn test_valid_file_with_warnings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("visualize.toml");
        std::fs::write(
            &path,
            r#"
max_wait_ticks = 10
window_capacity = 4

[source]
kind = "synthetic"
width = 64
height = 48

[analysis]
kind = "none"
"#,
        )
        .unwrap();

        let result = validate_config(&args(path));
        assert!(result.valid);
        let warnings = result.warnings.unwrap();
        assert!(warnings.iter().any(|w| w.contains("evictions")));
        assert!(warnings.iter().any(|w| w.contains("analysis is disabled")));
        assert_eq!(result.summary.unwrap().analysis, "none");
    }

    #[test]
    fn test_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("visualize.json");
        std::fs::write(
            &path,
            r#"{ "window_capacity": 0, "source": { "kind": "device", "index": 0 } }"#,
        )
        .unwrap();

        let result = validate_config(&args(path));
        assert!(!result.valid);
        assert!(result.error.unwrap().contains("window_capacity"));
    }

    #[test]
    fn test_missing_file() {
        let result = validate_config(&args(PathBuf::from("/nonexistent/visualize.toml")));
        assert!(!result.valid);
        assert!(result.error.unwrap().contains("File not found"));
    }
}
