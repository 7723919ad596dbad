//! ib-convert: the conversion orchestration core.
//!
//! This crate sequences one image conversion end to end -- acquire a content
//! retention lease, resolve the target reference, pull, convert through a
//! pluggable driver, push -- and provides the dispatch façade that runs
//! conversions either inline or on the worker pool.
//!
//! The actual image transformation, the content store, and lease bookkeeping
//! live behind narrow traits ([`Driver`], [`ContentProvider`],
//! [`LeaseManager`]) so alternative backends can be substituted without
//! touching the pipeline.

pub mod converter;
pub mod metrics;
pub mod provider;

pub use converter::Converter;
pub use metrics::{MetricsRecorder, TelemetryRecorder};
pub use provider::{ContentDescriptor, ContentProvider, ConvertContext, Driver, Lease, LeaseManager};
