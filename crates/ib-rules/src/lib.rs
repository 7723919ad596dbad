//! ib-rules: reference-rewrite rule resolution.
//!
//! Maps a source image reference to the target reference it should be
//! converted and republished under, and detects references that are already
//! in target form.

pub mod resolver;

pub use resolver::RuleResolver;
