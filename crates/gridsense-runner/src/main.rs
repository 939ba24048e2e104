//! gridsense
//!
//! Stream-driven classifier for 8×8 numeric matrices.
//!
//! Reads a textual matrix per line from stdin or a device/file, classifies it
//! with a fixed-topology model, prints a diagnostic report per line, and
//! pulses an indicator on confident detections.

use anyhow::Result;
use clap::Parser;
use gridsense_classifiers::{CandleEngine, ClassificationPipeline, LogSignal};
use gridsense_telemetry::{MetricsCollector, ReportFormat};
use metrics_exporter_prometheus::PrometheusHandle;
use std::path::PathBuf;
use std::time::Duration;
use tokio::signal;
use tracing::{debug, error, info, warn};

mod config;
mod reader;
mod runner;

use config::RunnerConfig;
use reader::{forward_lines, line_channel, open_input};
use runner::Runner;

#[derive(Parser, Debug)]
#[command(name = "gridsense")]
#[command(about = "Classify 8x8 matrices arriving as text lines", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "gridsense.yaml")]
    config: String,

    /// Input path, `-` for stdin
    #[arg(short, long)]
    input: Option<String>,

    /// Model weights (SafeTensors)
    #[arg(short, long)]
    model: Option<PathBuf>,

    /// Report format: text or json
    #[arg(short, long)]
    format: Option<ReportFormat>,

    /// Detection threshold override
    #[arg(short, long)]
    threshold: Option<f32>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    init_tracing(cli.verbose);

    // One cooperative thread: the reader task and the control loop interleave
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    let result = runtime.block_on(run(cli));

    // A pending stdin read cannot be cancelled; don't wait on it
    runtime.shutdown_timeout(Duration::from_millis(100));
    result
}

async fn run(cli: Cli) -> Result<()> {
    info!("Starting gridsense");

    // Load configuration
    let config = RunnerConfig::load(&cli.config, &cli)?;
    info!("Configuration loaded successfully");
    info!("Model: {}", config.classifier.model.path.display());
    info!("Labels: {}", config.classifier.labels.join(", "));
    info!("Threshold: {}", config.classifier.threshold);

    // Initialize metrics
    let metrics_handle = init_metrics()?;

    // Without an engine no line can ever be classified: stop here for good
    let engine = match CandleEngine::load(&config.classifier.model) {
        Ok(engine) => engine,
        Err(e) => {
            error!(error = %e, "Inference engine initialization failed, halting");
            shutdown_signal().await;
            anyhow::bail!("halted after engine initialization failure: {}", e);
        }
    };

    let pipeline = ClassificationPipeline::from_config(engine, &config.classifier)?;
    info!("Classification pipeline ready");

    let input = open_input(&config.input).await?;
    let (tx, rx) = line_channel();
    let max_line_len = config.max_line_len;
    let reader = tokio::spawn(async move {
        match forward_lines(input, max_line_len, tx).await {
            Ok(lines) => debug!(lines, "reader finished"),
            Err(e) => error!(error = %e, "input stream failed"),
        }
    });

    let mut runner = Runner::new(
        pipeline,
        LogSignal::new(),
        config.classifier.signal.interval(),
        config.format,
        MetricsCollector::new(),
    );

    let processed = runner
        .run(rx, &mut std::io::stdout(), shutdown_signal())
        .await?;
    reader.abort();

    let snapshot = runner.metrics().snapshot();
    info!(
        processed,
        detections = snapshot.detections,
        parse_failures = snapshot.parse_failures,
        inference_failures = snapshot.inference_failures,
        avg_total_us = snapshot.avg_total_latency_us(),
        signal_transitions = runner.sink().transitions(),
        "Run complete"
    );
    debug!("Final metrics:\n{}", metrics_handle.render());

    Ok(())
}

/// Listen for shutdown signals (SIGTERM, SIGINT)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
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

/// Initialize tracing/logging
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("gridsense=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("gridsense=info"))
    };

    // Reports own stdout; logs go to stderr
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Initialize metrics recorder and return handle for rendering
fn init_metrics() -> Result<PrometheusHandle> {
    use metrics_exporter_prometheus::PrometheusBuilder;

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("Failed to install metrics: {}", e))?;

    MetricsCollector::describe();

    info!("Metrics recorder initialized");
    Ok(handle)
}
