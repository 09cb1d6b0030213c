//! Configuration validation
//!
//! Rules:
//! - window_capacity >= 1
//! - source dimensions > 0, fps finite and > 0, paths non-empty
//! - viewport dimensions > 0, snapshot_every >= 1, vector_grid <= 64
//! - queue capacities >= 1

use std::path::Path;

use contracts::{
    AnalysisConfig, RenderConfig, RuntimeConfig, SourceConfig, VisError, VisualizationConfig,
};

/// Densest displacement grid the overlay will draw
const MAX_VECTOR_GRID: u32 = 64;

/// Validate a configuration, returning the first violated rule
pub fn validate(config: &VisualizationConfig) -> Result<(), VisError> {
    validate_sync(config)?;
    validate_source(&config.source)?;
    validate_analysis(&config.analysis)?;
    validate_render(&config.render)?;
    validate_runtime(&config.runtime)?;
    Ok(())
}

fn validate_sync(config: &VisualizationConfig) -> Result<(), VisError> {
    if config.window_capacity == 0 {
        return Err(VisError::config_validation(
            "window_capacity",
            "window_capacity must be >= 1",
        ));
    }
    Ok(())
}

fn validate_source(source: &SourceConfig) -> Result<(), VisError> {
    let fps = source.fps();
    if !fps.is_finite() || fps <= 0.0 {
        return Err(VisError::config_validation(
            "source.fps",
            format!("fps must be > 0, got {fps}"),
        ));
    }

    match source {
        SourceConfig::Synthetic { width, height, .. } => {
            if *width == 0 || *height == 0 {
                return Err(VisError::config_validation(
                    "source.width / source.height",
                    format!("frame size must be non-zero, got {width}x{height}"),
                ));
            }
        }
        SourceConfig::ImageSequence { path, .. } => require_path("source.path", path)?,
        SourceConfig::Device { .. } => {}
    }
    Ok(())
}

fn validate_analysis(analysis: &AnalysisConfig) -> Result<(), VisError> {
    match analysis {
        AnalysisConfig::Replay { path } => require_path("analysis.path", path),
        AnalysisConfig::Synthetic {
            fail_after: Some(0),
            ..
        } => Err(VisError::config_validation(
            "analysis.fail_after",
            "fail_after must be >= 1 when set",
        )),
        AnalysisConfig::Synthetic { .. } | AnalysisConfig::None => Ok(()),
    }
}

fn validate_render(render: &RenderConfig) -> Result<(), VisError> {
    if render.viewport_width == 0 || render.viewport_height == 0 {
        return Err(VisError::config_validation(
            "render.viewport_width / render.viewport_height",
            format!(
                "viewport must be non-zero, got {}x{}",
                render.viewport_width, render.viewport_height
            ),
        ));
    }

    let max_side = u32::from(u16::MAX);
    if render.viewport_width > max_side || render.viewport_height > max_side {
        return Err(VisError::config_validation(
            "render.viewport_width / render.viewport_height",
            format!(
                "viewport sides must be <= {max_side}, got {}x{}",
                render.viewport_width, render.viewport_height
            ),
        ));
    }

    if render
        .hud_font
        .as_ref()
        .is_some_and(|path| path.as_os_str().is_empty())
    {
        return Err(VisError::config_validation(
            "render.hud_font",
            "hud_font must not be empty when set",
        ));
    }

    if render.snapshot_every == 0 {
        return Err(VisError::config_validation(
            "render.snapshot_every",
            "snapshot_every must be >= 1",
        ));
    }

    if render.vector_grid > MAX_VECTOR_GRID {
        return Err(VisError::config_validation(
            "render.vector_grid",
            format!(
                "vector_grid must be <= {MAX_VECTOR_GRID}, got {}",
                render.vector_grid
            ),
        ));
    }
    Ok(())
}

fn validate_runtime(runtime: &RuntimeConfig) -> Result<(), VisError> {
    if runtime.frame_queue_capacity == 0 {
        return Err(VisError::config_validation(
            "runtime.frame_queue_capacity",
            "frame_queue_capacity must be >= 1",
        ));
    }
    if runtime.result_queue_capacity == 0 {
        return Err(VisError::config_validation(
            "runtime.result_queue_capacity",
            "result_queue_capacity must be >= 1",
        ));
    }
    Ok(())
}

fn require_path(field: &str, path: &Path) -> Result<(), VisError> {
    if path.as_os_str().is_empty() {
        return Err(VisError::config_validation(field, "path cannot be empty"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn minimal_config() -> VisualizationConfig {
        VisualizationConfig::synthetic(320, 240)
    }

    fn error_text(config: &VisualizationConfig) -> String {
        validate(config).unwrap_err().to_string()
    }

    #[test]
    fn test_valid_config() {
        assert!(validate(&minimal_config()).is_ok());
    }

    #[test]
    fn test_zero_wait_is_allowed() {
        let mut config = minimal_config();
        config.max_wait_ticks = 0;
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_zero_window_capacity() {
        let mut config = minimal_config();
        config.window_capacity = 0;
        assert!(error_text(&config).contains("window_capacity must be >= 1"));
    }

    #[test]
    fn test_invalid_fps() {
        let mut config = minimal_config();
        config.source = SourceConfig::Device {
            index: 0,
            fps: -1.0,
        };
        let err = error_text(&config);
        assert!(err.contains("fps must be > 0"), "got: {err}");

        config.source = SourceConfig::Device {
            index: 0,
            fps: f64::NAN,
        };
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_zero_frame_size() {
        let config = VisualizationConfig::synthetic(0, 240);
        let err = error_text(&config);
        assert!(err.contains("non-zero"), "got: {err}");
    }

    #[test]
    fn test_empty_paths() {
        let mut config = minimal_config();
        config.source = SourceConfig::ImageSequence {
            path: PathBuf::new(),
            fps: 30.0,
            loop_playback: false,
        };
        assert!(error_text(&config).contains("source.path"));

        let mut config = minimal_config();
        config.analysis = AnalysisConfig::Replay {
            path: PathBuf::new(),
        };
        assert!(error_text(&config).contains("analysis.path"));
    }

    #[test]
    fn test_render_rules() {
        let mut config = minimal_config();
        config.render.viewport_height = 0;
        assert!(error_text(&config).contains("viewport must be non-zero"));

        let mut config = minimal_config();
        config.render.snapshot_every = 0;
        assert!(error_text(&config).contains("snapshot_every"));

        let mut config = minimal_config();
        config.render.vector_grid = 65;
        assert!(error_text(&config).contains("vector_grid must be <= 64"));

        let mut config = minimal_config();
        config.render.viewport_width = 70_000;
        assert!(error_text(&config).contains("<= 65535"));

        let mut config = minimal_config();
        config.render.hud_font = Some(PathBuf::new());
        assert!(error_text(&config).contains("hud_font"));
    }

    #[test]
    fn test_queue_capacities() {
        let mut config = minimal_config();
        config.runtime.result_queue_capacity = 0;
        assert!(error_text(&config).contains("result_queue_capacity"));
    }

    #[test]
    fn test_fail_after_zero() {
        let mut config = minimal_config();
        config.analysis = AnalysisConfig::Synthetic {
            latency_frames: 0,
            invalid_every: 0,
            descriptor: Default::default(),
            fail_after: Some(0),
        };
        assert!(error_text(&config).contains("fail_after"));
    }
}
