//! Ingestion error types

use contracts::VisError;
use thiserror::Error;

/// Failure raised on an acquisition thread.
///
/// Crosses the frame queue as a value and is converted into a
/// [`VisError`] on the main thread.
#[derive(Debug, Clone, Error)]
pub enum SourceFailure {
    /// Device could not be opened or stopped delivering
    #[error("device unavailable: {message}")]
    Unavailable {
        /// Error message
        message: String,
    },

    /// A frame could not be decoded
    #[error("failed to decode {item}: {message}")]
    Decode {
        /// Item being decoded (file name, buffer index)
        item: String,
        /// Error message
        message: String,
    },

    /// Acquisition thread exited without reporting
    #[error("capture worker disconnected")]
    Disconnected,
}

impl SourceFailure {
    /// Create unavailable failure
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    /// Create decode failure
    pub fn decode(item: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            item: item.into(),
            message: message.into(),
        }
    }

    /// Convert into the shared error taxonomy
    pub fn into_vis_error(self, device: &str) -> VisError {
        VisError::device_unavailable(device, self.to_string())
    }
}

/// Fatal failure of the analysis library
#[derive(Debug, Clone, Error)]
#[error("{analyzer} failed: {message}")]
pub struct AnalysisFault {
    /// Analyzer name
    pub analyzer: String,
    /// Error message
    pub message: String,
}

impl AnalysisFault {
    /// Create analysis fault
    pub fn new(analyzer: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            analyzer: analyzer.into(),
            message: message.into(),
        }
    }
}
