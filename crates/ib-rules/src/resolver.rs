//! The [`RuleResolver`] maps source references to target references.

use ib_core::{ConversionRule, Error, Result};

/// Resolver that holds the configured rewrite rules and applies them to
/// source references.
///
/// Rules are evaluated in configured order and the first rule whose
/// `source_prefix` matches wins. Resolution is a pure function: the same
/// reference and rule set always yield the same target.
#[derive(Debug, Clone)]
pub struct RuleResolver {
    rules: Vec<ConversionRule>,
}

impl RuleResolver {
    /// Create a new resolver over the given rules.
    pub fn new(rules: Vec<ConversionRule>) -> Self {
        Self { rules }
    }

    /// Map a source reference to its target reference.
    ///
    /// # Errors
    ///
    /// - [`Error::Validation`] if the reference is empty.
    /// - [`Error::AlreadyConverted`] if the reference is already in the form
    ///   the matching rule would produce. This is an expected skip signal,
    ///   not a failure.
    /// - [`Error::NoMatchingRule`] if no rule applies.
    pub fn map(&self, source: &str) -> Result<String> {
        if source.is_empty() {
            return Err(Error::Validation("source reference is empty".into()));
        }

        for rule in &self.rules {
            if !source.starts_with(&rule.source_prefix) {
                continue;
            }

            // The reference already carries the suffix this rule mandates
            // (or the rule is a no-op rewrite): nothing to convert.
            if rule.tag_suffix.is_empty() || source.ends_with(&rule.tag_suffix) {
                return Err(Error::AlreadyConverted {
                    reference: source.to_string(),
                });
            }

            return Ok(format!("{source}{}", rule.tag_suffix));
        }

        Err(Error::NoMatchingRule {
            reference: source.to_string(),
        })
    }

    /// Return a reference to the internal rules slice.
    pub fn rules(&self) -> &[ConversionRule] {
        &self.rules
    }
}
