//! # Integration Tests
//!
//! End-to-end scenarios across crates.
//!
//! Covers:
//! - Scripted source → synchronizer → overlay, driven by a loaded config
//! - Recorded flow results replayed through the loop
//! - Threaded acquisition and analysis workers
//! - Collaborator failures surfacing as a stopped loop

#[cfg(test)]
mod contract_tests {
    use contracts::PairStatus;

    #[test]
    fn test_status_labels_match_serde_names() {
        for status in [
            PairStatus::Annotated,
            PairStatus::Invalid,
            PairStatus::TimedOut,
            PairStatus::Evicted,
        ] {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.as_str()));
        }
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::io::Write;

    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{
        FlowResult, FrameId, TransformDescriptor, VisError, VisualizationConfig, Viewport,
    };
    use ingestion::{ReplayFlowChannel, ReplayRecord, ScriptedFlowChannel, ScriptedFrameSource};
    use overlay::{RecordingClient, RecordingLog};
    use vis_loop::{LoopState, StopReason, VisualizationLoop};

    const SCENARIO_TOML: &str = r#"
max_wait_ticks = 2
window_capacity = 8

[source]
kind = "synthetic"
width = 16
height = 12

[analysis]
kind = "none"

[render]
viewport_width = 64
viewport_height = 48

[runtime]
tick_interval_ms = 0
"#;

    fn scenario_config() -> VisualizationConfig {
        ConfigLoader::load_from_str(SCENARIO_TOML, ConfigFormat::Toml).unwrap()
    }

    fn recording_client(config: &VisualizationConfig) -> (RecordingClient, RecordingLog) {
        let client = RecordingClient::new(Viewport {
            width: config.render.viewport_width,
            height: config.render.viewport_height,
        });
        let log = client.log();
        (client, log)
    }

    fn result(id: u64) -> FlowResult {
        FlowResult::new(
            FrameId::new(id),
            TransformDescriptor::Homography([1.0, 0.0, 1.5, 0.0, 1.0, -0.5, 0.0, 0.0, 1.0]),
            0.75,
        )
    }

    /// Frames 1..5 on ticks 1..5; results for 1, 3, 5 each arrive one tick
    /// after their frame.
    #[test]
    fn test_e2e_alternating_results() {
        let config = scenario_config();
        let (client, log) = recording_client(&config);
        let channel = ScriptedFlowChannel::batches(vec![
            vec![],
            vec![result(1)],
            vec![],
            vec![result(3)],
            vec![],
            vec![result(5)],
        ]);

        let mut vis = VisualizationLoop::new(
            Box::new(ScriptedFrameSource::frames(1..=5, 16, 12)),
            Box::new(channel),
            Box::new(client),
            &config,
        );
        let report = vis.run();

        assert_eq!(log.frame_ids(), vec![1, 2, 3, 4, 5]);
        assert_eq!(log.annotated_ids(), vec![1, 3, 5]);
        assert_eq!(report.stop_reason, Some(StopReason::EndOfStream));
        assert_eq!(report.summary.annotated, 3);
        assert_eq!(report.summary.timed_out, 2);
        assert_eq!(report.summary.wait_ticks.max, 2.0);
        assert!(report.sync.peak_occupancy <= config.window_capacity);
    }

    #[test]
    fn test_e2e_replayed_results_and_late_discard() {
        let records = [(2, 1), (4, 3), (5, 2), (6, 5)];
        let mut file = tempfile::NamedTempFile::new().unwrap();
        for (release_tick, frame_id) in records {
            let record = ReplayRecord {
                release_tick,
                result: result(frame_id),
            };
            writeln!(file, "{}", serde_json::to_string(&record).unwrap()).unwrap();
        }

        let config = scenario_config();
        let (client, log) = recording_client(&config);
        let mut vis = VisualizationLoop::new(
            Box::new(ScriptedFrameSource::frames(1..=5, 16, 12)),
            Box::new(ReplayFlowChannel::load(file.path()).unwrap()),
            Box::new(client),
            &config,
        );
        let report = vis.run();

        assert_eq!(log.frame_ids(), vec![1, 2, 3, 4, 5]);
        // frame 2 timed out at tick 4; its result shows up at tick 5
        assert_eq!(log.annotated_ids(), vec![1, 3, 5]);
        assert_eq!(report.sync.late_results, 1);
    }

    #[test]
    fn test_e2e_starved_window_stays_bounded() {
        let mut config = scenario_config();
        config.max_wait_ticks = 1_000;
        config.window_capacity = 3;
        let (client, log) = recording_client(&config);

        let mut vis = VisualizationLoop::new(
            Box::new(ScriptedFrameSource::frames(1..=50, 16, 12)),
            Box::new(ScriptedFlowChannel::default()),
            Box::new(client),
            &config,
        );
        vis.run();

        let report = vis.report();
        assert_eq!(report.sync.peak_occupancy, 3);
        assert_eq!(report.sync.evicted, 47);
        assert_eq!(log.frame_ids(), (1..=50).collect::<Vec<_>>());
        assert!(log.annotated_ids().is_empty());
    }

    #[test]
    fn test_e2e_threaded_synthetic_pipeline() {
        let toml = r#"
max_wait_ticks = 100
window_capacity = 16

[source]
kind = "synthetic"
width = 32
height = 24
fps = 200.0

[analysis]
kind = "synthetic"
latency_frames = 1
invalid_every = 3
descriptor = "vector_field"

[render]
viewport_width = 64
viewport_height = 48

[runtime]
tick_interval_ms = 2
max_frames = 9
"#;
        let config = ConfigLoader::load_from_str(toml, ConfigFormat::Toml).unwrap();
        let (client, log) = recording_client(&config);

        let mut vis = VisualizationLoop::new(
            ingestion::open_frame_source(&config).unwrap(),
            ingestion::open_flow_channel(&config).unwrap(),
            Box::new(client),
            &config,
        );
        let report = vis.run();

        assert_eq!(report.state, LoopState::Stopped);
        assert_eq!(report.stop_reason, Some(StopReason::FrameLimit));
        assert_eq!(log.frame_ids(), (1..=9).collect::<Vec<_>>());
        for invalid in [3, 6, 9] {
            assert!(!log.annotated_ids().contains(&invalid));
        }
        assert!(vis.take_error().is_none());
    }

    #[test]
    fn test_e2e_analysis_failure_stops_after_delivered_results() {
        let toml = r#"
max_wait_ticks = 500
window_capacity = 16

[source]
kind = "synthetic"
width = 32
height = 24
fps = 200.0

[analysis]
kind = "synthetic"
fail_after = 3

[runtime]
tick_interval_ms = 1
"#;
        let config = ConfigLoader::load_from_str(toml, ConfigFormat::Toml).unwrap();
        let (client, log) = recording_client(&config);

        let mut vis = VisualizationLoop::new(
            ingestion::open_frame_source(&config).unwrap(),
            ingestion::open_flow_channel(&config).unwrap(),
            Box::new(client),
            &config,
        );
        let report = vis.run();

        assert!(matches!(
            report.stop_reason,
            Some(StopReason::Failed {
                collaborator: "transform flow analysis",
                ..
            })
        ));
        assert!(matches!(
            vis.take_error(),
            Some(VisError::AnalysisUnavailable { .. })
        ));
        assert_eq!(log.annotated_ids(), vec![1, 2, 3]);
    }

    #[test]
    fn test_e2e_unavailable_device_is_reported_at_open() {
        let toml = r#"
[source]
kind = "device"
index = 3
"#;
        let config = ConfigLoader::load_from_str(toml, ConfigFormat::Toml).unwrap();
        let err = ingestion::open_frame_source(&config).err().unwrap();
        assert!(matches!(err, VisError::DeviceUnavailable { .. }));
        assert_eq!(err.collaborator(), "video capture");
    }
}
