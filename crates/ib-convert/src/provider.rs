//! Collaborator capabilities consumed by the conversion pipeline.
//!
//! The pipeline never talks to a registry or store directly; it drives these
//! traits. Implementations live outside this crate.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use ib_core::Result;

/// Opaque handle to converted content, produced by a [`Driver`] and consumed
/// by the push step. It has no meaning outside one pipeline run.
#[derive(Debug, Clone)]
pub struct ContentDescriptor {
    /// Content-addressable digest of the converted image.
    pub digest: String,
    /// Total size in bytes.
    pub size: u64,
}

/// Context passed to every collaborator call during one conversion.
#[derive(Debug, Clone)]
pub struct ConvertContext {
    /// The source reference being converted.
    pub source: String,
    /// The target reference the converted image will be pushed under.
    pub target: String,
    /// Token checked between stages; collaborators should abort in-flight
    /// I/O when it fires.
    pub cancellation: CancellationToken,
}

/// Pull and push image content against a registry-backed store.
#[async_trait]
pub trait ContentProvider: Send + Sync {
    /// Fetch the content of `reference` into the store.
    async fn pull(&self, ctx: &ConvertContext, reference: &str) -> Result<()>;

    /// Publish `descriptor` under `reference`.
    async fn push(
        &self,
        ctx: &ConvertContext,
        descriptor: &ContentDescriptor,
        reference: &str,
    ) -> Result<()>;
}

/// Pluggable capability performing the actual image transformation.
#[async_trait]
pub trait Driver: Send + Sync {
    /// Convert previously pulled content into its accelerated form.
    async fn convert(
        &self,
        ctx: &ConvertContext,
        content: &dyn ContentProvider,
    ) -> Result<ContentDescriptor>;
}

/// Scoped guarantee that content referenced during a conversion is protected
/// from garbage collection.
///
/// The release closure runs exactly once, when the lease is dropped. The
/// pipeline holds the lease for the duration of one conversion, so release
/// happens on every exit path, including unwinds.
pub struct Lease {
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl Lease {
    /// Create a lease whose drop invokes `release`.
    pub fn new(release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }

    /// Create a lease with no release side effect.
    pub fn noop() -> Self {
        Self { release: None }
    }
}

impl Drop for Lease {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl std::fmt::Debug for Lease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lease").finish_non_exhaustive()
    }
}

/// Hands out content-retention leases from the external store.
#[async_trait]
pub trait LeaseManager: Send + Sync {
    /// Acquire a lease scoped to one conversion.
    async fn with_lease(&self) -> Result<Lease>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn lease_releases_exactly_once_on_drop() {
        let released = Arc::new(AtomicUsize::new(0));
        let r = released.clone();
        let lease = Lease::new(move || {
            r.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(released.load(Ordering::SeqCst), 0);
        drop(lease);
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn lease_releases_on_unwind() {
        let released = Arc::new(AtomicUsize::new(0));
        let r = released.clone();
        let result = std::panic::catch_unwind(move || {
            let _lease = Lease::new(move || {
                r.fetch_add(1, Ordering::SeqCst);
            });
            panic!("boom");
        });
        assert!(result.is_err());
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn noop_lease_drops_quietly() {
        drop(Lease::noop());
    }
}
