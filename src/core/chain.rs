//! Ordered rule chains.
//!
//! Rule `i`'s output is rule `i + 1`'s input, and every rule sees the same
//! item context. A rule whose directory expansion fails leaves its input
//! unchanged; the chain records the failure instead of aborting.

use serde::Serialize;
use tracing::{instrument, warn};

use crate::core::matcher::{ItemContext, RuleMatcher};
use crate::core::pattern::{PatternCompileError, RuleDefinition};

/// A rule that fell back to the identity for one item
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleFallback {
    /// Position of the rule in the chain
    pub rule: usize,
    /// Why the item-specific pattern was rejected
    pub reason: String,
}

/// Name produced by a chain for one item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComputedName {
    pub name: String,
    pub fallbacks: Vec<RuleFallback>,
}

/// Insertion-ordered rule chain
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleChain {
    matchers: Vec<RuleMatcher>,
}

impl RuleChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile every definition in order; the first invalid one rejects
    /// the whole chain
    #[instrument(skip_all, fields(rules = definitions.len()))]
    pub fn from_definitions(definitions: &[RuleDefinition]) -> Result<Self, PatternCompileError> {
        let matchers = definitions
            .iter()
            .map(RuleMatcher::compile)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { matchers })
    }

    /// Compile and append one rule; nothing is added on failure
    pub fn try_push(&mut self, definition: &RuleDefinition) -> Result<(), PatternCompileError> {
        self.matchers.push(RuleMatcher::compile(definition)?);
        Ok(())
    }

    pub fn push(&mut self, matcher: RuleMatcher) {
        self.matchers.push(matcher);
    }

    pub fn len(&self) -> usize {
        self.matchers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matchers.is_empty()
    }

    pub fn matchers(&self) -> &[RuleMatcher] {
        &self.matchers
    }

    /// Run the chain over `original`, collecting per-rule fallbacks
    pub fn compute(&self, original: &str, ctx: &ItemContext<'_>) -> ComputedName {
        let mut name = original.to_string();
        let mut fallbacks = Vec::new();

        for (rule, matcher) in self.matchers.iter().enumerate() {
            match matcher.rewrite(&name, ctx) {
                Ok(next) => name = next,
                Err(err) => {
                    warn!(
                        rule,
                        item = original,
                        directory = ctx.directory_name,
                        error = %err,
                        "directory expansion failed; rule left the name unchanged"
                    );
                    fallbacks.push(RuleFallback {
                        rule,
                        reason: err.to_string(),
                    });
                }
            }
        }

        ComputedName { name, fallbacks }
    }

    pub fn compute_name(&self, original: &str, ctx: &ItemContext<'_>) -> String {
        compute_name(&self.matchers, original, ctx)
    }
}

impl<'a> IntoIterator for &'a RuleChain {
    type Item = &'a RuleMatcher;
    type IntoIter = std::slice::Iter<'a, RuleMatcher>;

    fn into_iter(self) -> Self::IntoIter {
        self.matchers.iter()
    }
}

/// Apply `chain` to `original` in order; an empty chain returns the input
pub fn compute_name(chain: &[RuleMatcher], original: &str, ctx: &ItemContext<'_>) -> String {
    chain
        .iter()
        .fold(original.to_string(), |name, matcher| matcher.apply(&name, ctx))
}
