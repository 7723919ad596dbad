//! The [`Converter`]: conversion pipeline and dispatch façade.
//!
//! One call to [`Converter::convert`] runs a single conversion end to end,
//! strictly sequentially. [`Converter::dispatch`] is the public entry point:
//! it either runs the pipeline inline (synchronous) or hands it to the
//! worker pool as a metrics-wrapped job (asynchronous).

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use ib_core::{ConverterConfig, Error, Result};
use ib_queue::{job, WorkerPool};
use ib_rules::RuleResolver;

use crate::metrics::{record_op, MetricsRecorder};
use crate::provider::{ContentProvider, ConvertContext, Driver, LeaseManager};

/// Everything one pipeline run needs, cheaply cloneable into queued jobs.
#[derive(Clone)]
struct Pipeline {
    resolver: Arc<RuleResolver>,
    provider: Arc<dyn ContentProvider>,
    driver: Arc<dyn Driver>,
    leases: Arc<dyn LeaseManager>,
}

impl Pipeline {
    /// Run one conversion: lease, resolve, pull, convert, push.
    ///
    /// The lease guard is held across every stage, so release happens exactly
    /// once no matter where the pipeline exits.
    async fn convert(&self, cancel: &CancellationToken, source: &str) -> Result<()> {
        let _lease = self
            .leases
            .with_lease()
            .await
            .map_err(|e| Error::stage("lease", e.to_string()))?;

        let target = match self.resolver.map(source) {
            Ok(target) => target,
            Err(e) if e.is_already_converted() => {
                tracing::info!(reference = %source, "Image already converted");
                return Ok(());
            }
            Err(e) => return Err(Error::stage("rule", e.to_string())),
        };

        let ctx = ConvertContext {
            source: source.to_string(),
            target: target.clone(),
            cancellation: cancel.clone(),
        };

        ensure_active(&ctx, "pull")?;
        tracing::info!(reference = %source, "Pulling image");
        self.provider
            .pull(&ctx, source)
            .await
            .map_err(|e| Error::stage("pull", e.to_string()))?;
        tracing::info!(reference = %source, "Pulled image");

        ensure_active(&ctx, "convert")?;
        tracing::info!(reference = %source, "Converting image");
        let descriptor = self
            .driver
            .convert(&ctx, self.provider.as_ref())
            .await
            .map_err(|e| Error::stage("convert", e.to_string()))?;
        tracing::info!(reference = %target, digest = %descriptor.digest, "Converted image");

        ensure_active(&ctx, "push")?;
        tracing::info!(reference = %target, "Pushing image");
        self.provider
            .push(&ctx, &descriptor, &target)
            .await
            .map_err(|e| Error::stage("push", e.to_string()))?;
        tracing::info!(reference = %target, "Pushed image");

        Ok(())
    }
}

/// Abort the pipeline before `stage` if cancellation has fired.
fn ensure_active(ctx: &ConvertContext, stage: &str) -> Result<()> {
    if ctx.cancellation.is_cancelled() {
        tracing::info!(reference = %ctx.source, stage, "Conversion cancelled");
        return Err(Error::stage(stage, "cancelled"));
    }
    Ok(())
}

/// Converts source images into their accelerated form and republishes them.
///
/// Construction wires the rule resolver and worker pool from configuration;
/// the content provider, driver, lease manager, and metrics recorder are
/// injected capabilities.
pub struct Converter {
    pipeline: Pipeline,
    pool: WorkerPool,
    metrics: Arc<dyn MetricsRecorder>,
    cancel: CancellationToken,
}

impl Converter {
    /// Build a converter from configuration and collaborator handles.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if the worker pool sizing is invalid.
    pub fn new(
        config: &ConverterConfig,
        provider: Arc<dyn ContentProvider>,
        driver: Arc<dyn Driver>,
        leases: Arc<dyn LeaseManager>,
        metrics: Arc<dyn MetricsRecorder>,
    ) -> Result<Self> {
        let pool = WorkerPool::new(config.worker_count, config.queue_capacity)?;
        Ok(Self {
            pipeline: Pipeline {
                resolver: Arc::new(RuleResolver::new(config.rules.clone())),
                provider,
                driver,
                leases,
            },
            pool,
            metrics,
            cancel: CancellationToken::new(),
        })
    }

    /// Run one conversion on the caller's path.
    ///
    /// An already-converted source is an informational no-op, not an error.
    pub async fn convert(&self, cancel: &CancellationToken, source: &str) -> Result<()> {
        self.pipeline.convert(cancel, source).await
    }

    /// Dispatch a conversion of `reference`.
    ///
    /// With `sync` set, the pipeline runs inline and this call blocks until
    /// it completes, returning its error. Otherwise the conversion is queued
    /// on the worker pool and this call returns `Ok(())` as soon as the job
    /// is accepted; the eventual outcome is observable only through logs and
    /// metrics.
    ///
    /// The caller's token is accepted for interface compatibility but is not
    /// forwarded on either path: the synchronous path runs under a fresh
    /// detached token, and queued jobs run under the converter's own
    /// shutdown token since they outlive the dispatching caller.
    pub async fn dispatch(
        &self,
        _cancel: &CancellationToken,
        reference: &str,
        sync: bool,
    ) -> Result<()> {
        if sync {
            return self.convert(&CancellationToken::new(), reference).await;
        }

        let pipeline = self.pipeline.clone();
        let recorder = Arc::clone(&self.metrics);
        let token = self.cancel.child_token();
        let reference = reference.to_string();

        self.pool
            .dispatch(job(async move {
                record_op(
                    recorder.as_ref(),
                    "convert",
                    pipeline.convert(&token, &reference),
                )
                .await
            }))
            .await
    }

    /// Cancel in-flight queued conversions and stop the worker pool.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        self.pool.shutdown().await;
    }
}
