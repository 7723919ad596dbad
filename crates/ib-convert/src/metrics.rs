//! Conversion metrics.
//!
//! The pipeline depends on an injected [`MetricsRecorder`] rather than a
//! process-wide singleton. The shipped [`TelemetryRecorder`] forwards to the
//! `metrics` facade, so whatever exporter the host application installs
//! (Prometheus or otherwise) sees conversion counts and latencies.

use std::future::Future;
use std::time::{Duration, Instant};

use ib_core::Result;

/// Records the outcome and latency of one named operation.
pub trait MetricsRecorder: Send + Sync {
    /// Record one completed operation.
    fn record(&self, op: &str, elapsed: Duration, ok: bool);
}

/// Run `fut`, recording its latency and outcome under `op`.
pub async fn record_op<F>(recorder: &dyn MetricsRecorder, op: &str, fut: F) -> Result<()>
where
    F: Future<Output = Result<()>>,
{
    let start = Instant::now();
    let result = fut.await;
    recorder.record(op, start.elapsed(), result.is_ok());
    result
}

/// [`MetricsRecorder`] that emits through the `metrics` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct TelemetryRecorder;

impl MetricsRecorder for TelemetryRecorder {
    fn record(&self, op: &str, elapsed: Duration, ok: bool) {
        let status = if ok { "success" } else { "failure" };
        metrics::counter!(
            "imageboost_operations_total",
            "op" => op.to_string(),
            "status" => status
        )
        .increment(1);
        metrics::histogram!(
            "imageboost_operation_duration_seconds",
            "op" => op.to_string()
        )
        .record(elapsed.as_secs_f64());
    }
}
