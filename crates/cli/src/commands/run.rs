//! `run` command implementation.

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use contracts::{VisError, VisualizationConfig};
use overlay::SoftwareClient;
use tracing::{error, info, warn};
use vis_loop::{LoopControl, LoopReport, VisualizationLoop};

use crate::cli::RunArgs;

/// Outcome of the blocking loop thread
struct RunOutcome {
    report: LoopReport,
    error: Option<VisError>,
    elapsed: Duration,
}

/// Execute the `run` command
pub async fn run_visualization(args: &RunArgs) -> Result<()> {
    let mut config = load_config(args)?;
    apply_overrides(&mut config, args);
    config_loader::validate(&config).context("Invalid configuration after CLI overrides")?;

    info!(
        source = %config.source.describe(),
        max_wait_ticks = config.max_wait_ticks,
        window_capacity = config.window_capacity,
        tick_interval_ms = config.runtime.tick_interval_ms,
        "Configuration loaded"
    );

    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&config);
        return Ok(());
    }

    if args.metrics_port != 0 {
        observability::init_metrics_only(args.metrics_port)?;
    }

    let control = LoopControl::new();
    let signal_control = control.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        warn!("Received shutdown signal, stopping visualization...");
        signal_control.stop();
    });

    // The render client is not `Send`, so everything is built on the loop thread
    let outcome = tokio::task::spawn_blocking(move || run_blocking(config, control))
        .await
        .context("Visualization thread panicked")??;

    print_summary(&outcome.report, outcome.elapsed);

    match outcome.error {
        Some(err) => Err(err).context("Visualization stopped on a fatal error"),
        None => {
            info!("tfvis finished");
            Ok(())
        }
    }
}

fn load_config(args: &RunArgs) -> Result<VisualizationConfig> {
    if args.synthetic {
        info!("Using built-in synthetic configuration");
        return Ok(VisualizationConfig::synthetic(640, 480));
    }

    info!(config = %args.config.display(), "Loading configuration");
    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))
}

/// Apply CLI overrides on top of the file configuration
fn apply_overrides(config: &mut VisualizationConfig, args: &RunArgs) {
    if let Some(ticks) = args.max_wait_ticks {
        config.max_wait_ticks = ticks;
    }
    if let Some(capacity) = args.window_capacity {
        config.window_capacity = capacity;
    }
    if let Some(interval) = args.tick_interval_ms {
        config.runtime.tick_interval_ms = interval;
    }
    if let Some(max) = args.max_ticks {
        config.runtime.max_ticks = max;
    }
    if let Some(max) = args.max_frames {
        config.runtime.max_frames = max;
    }
    if let Some(dir) = &args.snapshot_dir {
        config.render.snapshot_dir = Some(dir.clone());
    }
}

/// Open collaborators and run the loop to completion on the current thread
fn run_blocking(config: VisualizationConfig, control: LoopControl) -> Result<RunOutcome> {
    let started = Instant::now();

    let source = ingestion::open_frame_source(&config).inspect_err(log_startup_failure)?;
    let channel = ingestion::open_flow_channel(&config).inspect_err(log_startup_failure)?;
    let client = SoftwareClient::from_config(&config.render).inspect_err(log_startup_failure)?;

    let mut vis = VisualizationLoop::new(source, channel, Box::new(client), &config)
        .with_control(control);
    let report = vis.run();

    Ok(RunOutcome {
        report,
        error: vis.take_error(),
        elapsed: started.elapsed(),
    })
}

fn log_startup_failure(err: &VisError) {
    error!(
        collaborator = err.collaborator(),
        error = %err,
        "visualization could not start: {} failed",
        err.collaborator()
    );
}

/// Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

fn print_config_summary(config: &VisualizationConfig) {
    println!("\n=== Configuration Summary ===\n");
    println!("Source: {} @ {} fps", config.source.describe(), config.source.fps());
    println!("Analysis: {:?}", config.analysis);
    println!(
        "Sync: max_wait_ticks={}, window_capacity={}",
        config.max_wait_ticks, config.window_capacity
    );
    println!(
        "Render: {}x{}, retry_budget={}, legend={}, hud={}",
        config.render.viewport_width,
        config.render.viewport_height,
        config.render.retry_budget,
        config.render.show_legend,
        config.render.show_hud
    );
    if let Some(dir) = &config.render.snapshot_dir {
        println!("Snapshots: {} (every {})", dir.display(), config.render.snapshot_every);
    }
    println!();
}

fn print_summary(report: &LoopReport, elapsed: Duration) {
    let secs = elapsed.as_secs_f64();
    let fps = if secs > 0.0 {
        report.render.presented as f64 / secs
    } else {
        0.0
    };

    println!("\n=== tfvis run ===\n");
    println!("Duration: {:.2}s ({:.2} presented fps)", secs, fps);
    println!("{report}");
}
