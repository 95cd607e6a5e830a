//! Reusable decision cascade.
//!
//! The "check cheap local rules, else ask the remote model, else fall
//! back to a fixed default" pattern appears at several call sites
//! (message relevance, intent routing, drift escalation). The cascade
//! holds the ordered local rules; [`arbitrate`] resolves the optional
//! remote step with its per-call default-on-failure policy.

use jobscout_core::error::Result;

type Rule<M, V> = (Box<dyn Fn(&M) -> bool + Send + Sync>, V);

/// Ordered list of (predicate → verdict) rules; the first match wins.
pub struct DecisionCascade<M: ?Sized, V> {
    rules: Vec<Rule<M, V>>,
}

impl<M: ?Sized, V: Clone> DecisionCascade<M, V> {
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Append a rule. Rules are evaluated in insertion order.
    pub fn rule<F>(mut self, predicate: F, verdict: V) -> Self
    where
        F: Fn(&M) -> bool + Send + Sync + 'static,
    {
        self.rules.push((Box::new(predicate), verdict));
        self
    }

    /// First verdict whose predicate matches, or `None` when no local
    /// rule applies and the caller should escalate.
    pub fn decide(&self, input: &M) -> Option<V> {
        self.rules
            .iter()
            .find(|(predicate, _)| predicate(input))
            .map(|(_, verdict)| verdict.clone())
    }
}

impl<M: ?Sized, V: Clone> Default for DecisionCascade<M, V> {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolve a remote arbitration outcome against its failure default.
///
/// The default is chosen per call site: paths with a local keyword hit
/// stay lenient (failure means relevant), paths without one stay strict
/// (failure means off-topic). That asymmetry is intentional.
pub fn arbitrate<V>(remote: Result<V>, default_on_failure: V) -> V {
    match remote {
        Ok(verdict) => verdict,
        Err(e) => {
            tracing::warn!(error = %e, "Remote arbitration failed, using local default");
            default_on_failure
        }
    }
}
