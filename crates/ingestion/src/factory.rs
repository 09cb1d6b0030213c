//! Builds sources and channels from configuration

use contracts::{
    AnalysisConfig, FlowResultChannel, FrameSource, SourceConfig, VisError, VisualizationConfig,
};
use tracing::{info, instrument};

use crate::flow::{
    AnalysisWorker, NullFlowChannel, ReplayFlowChannel, SyntheticAnalyzer,
    SyntheticAnalyzerConfig,
};
use crate::sources::{
    CaptureBackend, DeviceBackend, ImageSequenceBackend, SyntheticBackend, ThreadedFrameSource,
};

/// Capture backend selected by the source configuration
pub fn capture_backend(source: &SourceConfig) -> Box<dyn CaptureBackend> {
    match source {
        SourceConfig::Synthetic {
            width,
            height,
            fps,
            frame_limit,
        } => Box::new(SyntheticBackend::new(*width, *height, *fps, *frame_limit)),
        SourceConfig::ImageSequence {
            path,
            fps,
            loop_playback,
        } => Box::new(ImageSequenceBackend::new(path.clone(), *fps, *loop_playback)),
        SourceConfig::Device { index, fps } => Box::new(DeviceBackend::new(*index, *fps)),
    }
}

/// Open the configured frame source and start acquisition
#[instrument(name = "open_frame_source", skip(config), fields(source = %config.source.describe()))]
pub fn open_frame_source(config: &VisualizationConfig) -> Result<Box<dyn FrameSource>, VisError> {
    let source = ThreadedFrameSource::spawn(
        capture_backend(&config.source),
        config.source.fps(),
        config.runtime.frame_queue_capacity,
    )?;
    Ok(Box::new(source))
}

/// Open the configured flow result channel
#[instrument(name = "open_flow_channel", skip(config))]
pub fn open_flow_channel(
    config: &VisualizationConfig,
) -> Result<Box<dyn FlowResultChannel>, VisError> {
    match &config.analysis {
        AnalysisConfig::Synthetic {
            latency_frames,
            invalid_every,
            descriptor,
            fail_after,
        } => {
            let analyzer = SyntheticAnalyzer::new(SyntheticAnalyzerConfig {
                latency_frames: *latency_frames,
                invalid_every: *invalid_every,
                descriptor: *descriptor,
                fail_after: *fail_after,
            });
            let worker = AnalysisWorker::spawn(
                Box::new(analyzer),
                config.runtime.frame_queue_capacity,
                config.runtime.result_queue_capacity,
            )?;
            Ok(Box::new(worker))
        }
        AnalysisConfig::Replay { path } => Ok(Box::new(ReplayFlowChannel::load(path)?)),
        AnalysisConfig::None => {
            info!("analysis disabled, frames render unannotated");
            Ok(Box::new(NullFlowChannel))
        }
    }
}
