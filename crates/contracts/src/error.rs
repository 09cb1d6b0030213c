//! Layered error definitions
//!
//! Categorized by collaborator: config / video capture / analysis / render

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum VisError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Video Capture Errors =====
    /// Capture device (or file) cannot deliver frames
    #[error("video capture device unavailable ({device}): {message}")]
    DeviceUnavailable { device: String, message: String },

    // ===== Analysis Errors =====
    /// Transform flow analysis signalled a fatal error
    #[error("transform flow analysis unavailable: {message}")]
    AnalysisUnavailable { message: String },

    // ===== Render Errors =====
    /// Rendering context lost more often than the retry budget allows
    #[error("render context lost {attempts} consecutive times: {message}")]
    RenderContextLost { attempts: u32, message: String },

    /// Rendering client failed for a reason other than context loss
    #[error("rendering client failed: {source}")]
    RenderFailed {
        #[source]
        source: crate::RenderError,
    },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl VisError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create device unavailable error
    pub fn device_unavailable(device: impl Into<String>, message: impl Into<String>) -> Self {
        Self::DeviceUnavailable {
            device: device.into(),
            message: message.into(),
        }
    }

    /// Create analysis unavailable error
    pub fn analysis_unavailable(message: impl Into<String>) -> Self {
        Self::AnalysisUnavailable {
            message: message.into(),
        }
    }

    /// Create render context lost error
    pub fn render_context_lost(attempts: u32, message: impl Into<String>) -> Self {
        Self::RenderContextLost {
            attempts,
            message: message.into(),
        }
    }

    /// Wrap a non-retryable client failure
    pub fn render_failed(source: crate::RenderError) -> Self {
        Self::RenderFailed { source }
    }

    /// Name of the external collaborator responsible for this error
    pub fn collaborator(&self) -> &'static str {
        match self {
            Self::ConfigParse { .. } | Self::ConfigValidation { .. } => "configuration",
            Self::DeviceUnavailable { .. } => "video capture",
            Self::AnalysisUnavailable { .. } => "transform flow analysis",
            Self::RenderContextLost { .. } | Self::RenderFailed { .. } => "rendering client",
            Self::Io(_) | Self::Other(_) => "runtime",
        }
    }

    /// Whether the visualization must stop on this error
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collaborator_names() {
        assert_eq!(
            VisError::device_unavailable("camera:0", "busy").collaborator(),
            "video capture"
        );
        assert_eq!(
            VisError::analysis_unavailable("crashed").collaborator(),
            "transform flow analysis"
        );
        assert_eq!(
            VisError::render_context_lost(3, "lost").collaborator(),
            "rendering client"
        );
        assert_eq!(
            VisError::render_failed(crate::RenderError::Backend("oom".into())).collaborator(),
            "rendering client"
        );
    }

    #[test]
    fn test_display_includes_context() {
        let e = VisError::device_unavailable("camera:1", "no such device");
        let text = e.to_string();
        assert!(text.contains("camera:1"));
        assert!(text.contains("no such device"));
        assert!(e.is_fatal());
    }
}
