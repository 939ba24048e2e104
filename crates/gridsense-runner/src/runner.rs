//! Control loop: one line in, one report out, optional signal pulse

use gridsense_classifiers::{pulse, ClassificationPipeline, InferenceEngine, SignalSink};
use gridsense_telemetry::{DiagnosticReport, MetricsCollector, ReportFormat};
use std::future::Future;
use std::io::Write;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Drives the pipeline from the line channel
pub struct Runner<E, S> {
    pipeline: ClassificationPipeline<E>,
    sink: S,
    interval: Duration,
    format: ReportFormat,
    metrics: MetricsCollector,
}

impl<E, S> Runner<E, S>
where
    E: InferenceEngine,
    S: SignalSink,
{
    pub fn new(
        pipeline: ClassificationPipeline<E>,
        sink: S,
        interval: Duration,
        format: ReportFormat,
        metrics: MetricsCollector,
    ) -> Self {
        Self {
            pipeline,
            sink,
            interval,
            format,
            metrics,
        }
    }

    /// Process lines until the channel closes or `shutdown` resolves.
    ///
    /// Returns the number of lines processed. A line that is being processed
    /// when shutdown is requested runs to completion first.
    pub async fn run<W, F>(
        &mut self,
        mut lines: mpsc::Receiver<String>,
        out: &mut W,
        shutdown: F,
    ) -> anyhow::Result<u64>
    where
        W: Write,
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut processed = 0;

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    warn!("Shutdown signal received, stopping control loop");
                    break;
                }
                line = lines.recv() => match line {
                    Some(line) => {
                        self.handle_line(&line, out).await?;
                        processed += 1;
                    }
                    None => {
                        info!("Input stream closed");
                        break;
                    }
                },
            }
        }

        Ok(processed)
    }

    /// Classify one line, write its report, and pulse on a detection
    pub async fn handle_line<W: Write>(&mut self, line: &str, out: &mut W) -> anyhow::Result<()> {
        let outcome = self.pipeline.process_line(line);
        self.metrics.record(&outcome);

        let report =
            DiagnosticReport::from_outcome(&outcome, self.pipeline.labels(), self.pipeline.threshold());
        writeln!(out, "{}", report.render(self.format)?)?;
        out.flush()?;

        if let Ok(classification) = &outcome.result {
            if classification.repetitions > 0 {
                if let Err(e) = pulse(&mut self.sink, classification.repetitions, self.interval).await {
                    warn!(error = %e, "signal action failed");
                }
            }
        }

        Ok(())
    }

    /// Aggregate metrics for this run
    pub fn metrics(&self) -> &MetricsCollector {
        &self.metrics
    }

    /// The signal sink
    pub fn sink(&self) -> &S {
        &self.sink
    }
}
