//! VisualizationConfig - Config Loader output
//!
//! Static configuration passed to every component at construction.
//! There is no process-wide configuration state.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Complete visualization configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisualizationConfig {
    /// Ticks a frame waits for its flow result before rendering unannotated
    #[serde(default = "default_max_wait_ticks")]
    pub max_wait_ticks: u64,

    /// Maximum number of frames pending in the synchronizer window
    #[serde(default = "default_window_capacity")]
    pub window_capacity: usize,

    /// Frame source selection
    pub source: SourceConfig,

    /// Flow result provider
    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// Overlay rendering settings
    #[serde(default)]
    pub render: RenderConfig,

    /// Loop pacing and queue sizes
    #[serde(default)]
    pub runtime: RuntimeConfig,
}

fn default_max_wait_ticks() -> u64 {
    2
}

fn default_window_capacity() -> usize {
    8
}

impl VisualizationConfig {
    /// Configuration with a synthetic source and defaults everywhere else
    pub fn synthetic(width: u32, height: u32) -> Self {
        Self {
            max_wait_ticks: default_max_wait_ticks(),
            window_capacity: default_window_capacity(),
            source: SourceConfig::Synthetic {
                width,
                height,
                fps: default_fps(),
                frame_limit: None,
            },
            analysis: AnalysisConfig::default(),
            render: RenderConfig::default(),
            runtime: RuntimeConfig::default(),
        }
    }

    /// Derive synchronizer configuration
    pub fn sync_config(&self) -> SyncConfig {
        SyncConfig {
            max_wait_ticks: self.max_wait_ticks,
            window_capacity: self.window_capacity,
        }
    }
}

/// Synchronizer configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Ticks a frame may wait for its result
    pub max_wait_ticks: u64,
    /// Pending window capacity (>= 1)
    pub window_capacity: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_wait_ticks: default_max_wait_ticks(),
            window_capacity: default_window_capacity(),
        }
    }
}

/// Frame source selection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceConfig {
    /// Generated moving test pattern
    Synthetic {
        width: u32,
        height: u32,
        #[serde(default = "default_fps")]
        fps: f64,
        /// Stop after this many frames (None = endless)
        #[serde(default)]
        frame_limit: Option<u64>,
    },

    /// Directory of PNG/JPEG files played in name order
    ImageSequence {
        path: PathBuf,
        #[serde(default = "default_fps")]
        fps: f64,
        #[serde(default)]
        loop_playback: bool,
    },

    /// Live capture device
    Device {
        index: u32,
        #[serde(default = "default_fps")]
        fps: f64,
    },
}

fn default_fps() -> f64 {
    30.0
}

impl SourceConfig {
    /// Human readable device description for diagnostics
    pub fn describe(&self) -> String {
        match self {
            SourceConfig::Synthetic { width, height, .. } => {
                format!("synthetic:{width}x{height}")
            }
            SourceConfig::ImageSequence { path, .. } => format!("file:{}", path.display()),
            SourceConfig::Device { index, .. } => format!("device:{index}"),
        }
    }

    /// Nominal capture rate
    pub fn fps(&self) -> f64 {
        match self {
            SourceConfig::Synthetic { fps, .. }
            | SourceConfig::ImageSequence { fps, .. }
            | SourceConfig::Device { fps, .. } => *fps,
        }
    }
}

/// Kind of descriptor the synthetic analyzer produces
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DescriptorKind {
    #[default]
    Homography,
    VectorField,
    Regions,
}

/// Flow result provider
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnalysisConfig {
    /// Deterministic stand-in for the analysis library
    Synthetic {
        /// Frames buffered before a result is released
        #[serde(default)]
        latency_frames: u64,
        /// Every n-th result is flagged invalid (0 = never)
        #[serde(default)]
        invalid_every: u64,
        /// Descriptor shape to produce
        #[serde(default)]
        descriptor: DescriptorKind,
        /// Signal a fatal analysis error after this many frames
        #[serde(default)]
        fail_after: Option<u64>,
    },

    /// Recorded results from a JSON-lines file
    Replay { path: PathBuf },

    /// No analysis; every frame renders unannotated
    None,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self::Synthetic {
            latency_frames: 0,
            invalid_every: 0,
            descriptor: DescriptorKind::default(),
            fail_after: None,
        }
    }
}

/// Overlay rendering settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Output surface width
    #[serde(default = "default_viewport_width")]
    pub viewport_width: u32,

    /// Output surface height
    #[serde(default = "default_viewport_height")]
    pub viewport_height: u32,

    /// Consecutive context losses tolerated before failing
    #[serde(default = "default_retry_budget")]
    pub retry_budget: u32,

    /// Draw the confidence legend
    #[serde(default = "default_true")]
    pub show_legend: bool,

    /// Grid density for homography/affine vector sampling (per axis)
    #[serde(default = "default_vector_grid")]
    pub vector_grid: u32,

    /// Draw the per-frame info text (id, time, status, wait, confidence)
    #[serde(default = "default_true")]
    pub show_hud: bool,

    /// TrueType/OpenType font used to rasterize the info text.
    /// Without one, headless clients skip text nodes.
    #[serde(default)]
    pub hud_font: Option<PathBuf>,

    /// Directory for PNG snapshots of presented frames (None = disabled)
    #[serde(default)]
    pub snapshot_dir: Option<PathBuf>,

    /// Snapshot every n-th presented frame
    #[serde(default = "default_snapshot_every")]
    pub snapshot_every: u64,
}

fn default_viewport_width() -> u32 {
    1280
}

fn default_viewport_height() -> u32 {
    720
}

fn default_retry_budget() -> u32 {
    3
}

fn default_true() -> bool {
    true
}

fn default_vector_grid() -> u32 {
    8
}

fn default_snapshot_every() -> u64 {
    30
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            viewport_width: default_viewport_width(),
            viewport_height: default_viewport_height(),
            retry_budget: default_retry_budget(),
            show_legend: true,
            vector_grid: default_vector_grid(),
            show_hud: true,
            hud_font: None,
            snapshot_dir: None,
            snapshot_every: default_snapshot_every(),
        }
    }
}

/// Loop pacing and queue sizes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Target tick interval in milliseconds
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Capacity of the acquisition -> main thread frame queue
    #[serde(default = "default_frame_queue_capacity")]
    pub frame_queue_capacity: usize,

    /// Capacity of the analysis -> main thread result queue
    #[serde(default = "default_result_queue_capacity")]
    pub result_queue_capacity: usize,

    /// Stop after this many ticks (0 = unlimited)
    #[serde(default)]
    pub max_ticks: u64,

    /// Stop after this many presented frames (0 = unlimited)
    #[serde(default)]
    pub max_frames: u64,
}

fn default_tick_interval_ms() -> u64 {
    33
}

fn default_frame_queue_capacity() -> usize {
    4
}

fn default_result_queue_capacity() -> usize {
    64
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            frame_queue_capacity: default_frame_queue_capacity(),
            result_queue_capacity: default_result_queue_capacity(),
            max_ticks: 0,
            max_frames: 0,
        }
    }
}
