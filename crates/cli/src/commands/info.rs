//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::{AnalysisConfig, VisualizationConfig};
use serde::Serialize;
use tracing::info;

use super::validate::analysis_label;
use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    source: SourceInfo,
    analysis: AnalysisInfo,
    sync: SyncInfo,
    render: RenderInfo,
    runtime: RuntimeInfo,
}

#[derive(Serialize)]
struct SourceInfo {
    description: String,
    fps: f64,
}

#[derive(Serialize)]
struct AnalysisInfo {
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

#[derive(Serialize)]
struct SyncInfo {
    max_wait_ticks: u64,
    window_capacity: usize,
}

#[derive(Serialize)]
struct RenderInfo {
    viewport: String,
    retry_budget: u32,
    show_legend: bool,
    show_hud: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    hud_font: Option<String>,
    vector_grid: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    snapshot_dir: Option<String>,
}

#[derive(Serialize)]
struct RuntimeInfo {
    tick_interval_ms: u64,
    frame_queue_capacity: usize,
    result_queue_capacity: usize,
    max_ticks: u64,
    max_frames: u64,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    let config = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    if args.effective {
        let toml = config_loader::ConfigLoader::to_toml(&config)
            .context("Failed to serialize effective configuration")?;
        println!("{}", toml);
    } else if args.json {
        let json = serde_json::to_string_pretty(&build_config_info(&config))
            .context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&config);
    }

    Ok(())
}

fn analysis_details(analysis: &AnalysisConfig) -> Option<String> {
    match analysis {
        AnalysisConfig::Synthetic {
            latency_frames,
            invalid_every,
            descriptor,
            fail_after,
        } => Some(format!(
            "{descriptor:?}, latency {latency_frames} frames, invalid every {invalid_every}, fail after {fail_after:?}"
        )),
        AnalysisConfig::Replay { path } => Some(path.display().to_string()),
        AnalysisConfig::None => None,
    }
}

fn build_config_info(config: &VisualizationConfig) -> ConfigInfo {
    ConfigInfo {
        source: SourceInfo {
            description: config.source.describe(),
            fps: config.source.fps(),
        },
        analysis: AnalysisInfo {
            kind: analysis_label(&config.analysis),
            details: analysis_details(&config.analysis),
        },
        sync: SyncInfo {
            max_wait_ticks: config.max_wait_ticks,
            window_capacity: config.window_capacity,
        },
        render: RenderInfo {
            viewport: format!(
                "{}x{}",
                config.render.viewport_width, config.render.viewport_height
            ),
            retry_budget: config.render.retry_budget,
            show_legend: config.render.show_legend,
            show_hud: config.render.show_hud,
            hud_font: config
                .render
                .hud_font
                .as_ref()
                .map(|p| p.display().to_string()),
            vector_grid: config.render.vector_grid,
            snapshot_dir: config
                .render
                .snapshot_dir
                .as_ref()
                .map(|p| p.display().to_string()),
        },
        runtime: RuntimeInfo {
            tick_interval_ms: config.runtime.tick_interval_ms,
            frame_queue_capacity: config.runtime.frame_queue_capacity,
            result_queue_capacity: config.runtime.result_queue_capacity,
            max_ticks: config.runtime.max_ticks,
            max_frames: config.runtime.max_frames,
        },
    }
}

fn print_config_info(config: &VisualizationConfig) {
    let info = build_config_info(config);

    println!("tfvis configuration\n");

    println!("Source");
    println!("   ├─ {}", info.source.description);
    println!("   └─ {} fps", info.source.fps);

    println!("\nAnalysis");
    match &info.analysis.details {
        Some(details) => {
            println!("   ├─ {}", info.analysis.kind);
            println!("   └─ {}", details);
        }
        None => println!("   └─ {}", info.analysis.kind),
    }

    println!("\nSync");
    println!("   ├─ Max wait: {} ticks", info.sync.max_wait_ticks);
    println!("   └─ Window capacity: {}", info.sync.window_capacity);

    println!("\nRender");
    println!("   ├─ Viewport: {}", info.render.viewport);
    println!("   ├─ Retry budget: {}", info.render.retry_budget);
    println!("   ├─ Legend: {}", info.render.show_legend);
    println!(
        "   ├─ HUD: {} (font: {})",
        info.render.show_hud,
        info.render.hud_font.as_deref().unwrap_or("none, text skipped")
    );
    println!("   ├─ Vector grid: {}", info.render.vector_grid);
    println!(
        "   └─ Snapshots: {}",
        info.render.snapshot_dir.as_deref().unwrap_or("(disabled)")
    );

    println!("\nRuntime");
    println!("   ├─ Tick interval: {} ms", info.runtime.tick_interval_ms);
    println!(
        "   ├─ Queues: frames {}, results {}",
        info.runtime.frame_queue_capacity, info.runtime.result_queue_capacity
    );
    println!(
        "   └─ Limits: {} ticks, {} frames (0 = unlimited)",
        info.runtime.max_ticks, info.runtime.max_frames
    );

    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_info_json_shape() {
        let mut config = VisualizationConfig::synthetic(64, 48);
        config.analysis = AnalysisConfig::Replay {
            path: PathBuf::from("results.jsonl"),
        };
        let json = serde_json::to_value(build_config_info(&config)).unwrap();

        assert_eq!(json["source"]["description"], "synthetic:64x48");
        assert_eq!(json["analysis"]["kind"], "replay");
        assert_eq!(json["analysis"]["details"], "results.jsonl");
        assert_eq!(json["sync"]["max_wait_ticks"], 2);
        assert!(json["render"].get("snapshot_dir").is_none());
    }
}
