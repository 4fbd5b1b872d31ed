//! Style rule side channel.
//!
//! Collects style rules emitted during a render for inline delivery in dev
//! mode. Scoped per request rather than process-wide: a fresh sink is
//! created with each context, so rules never leak between requests.
//! Accumulation is additive and idempotent per rule text.

use std::sync::{Arc, Mutex};

/// Cloneable handle to a per-request style rule accumulator.
#[derive(Debug, Clone, Default)]
pub struct StyleSink {
    rules: Arc<Mutex<Vec<String>>>,
}

impl StyleSink {
    /// Record a rule. Re-registering the same rule text is a no-op.
    pub fn push_rule(&self, rule: impl Into<String>) {
        let rule = rule.into();
        let mut rules = self.lock();
        if !rules.contains(&rule) {
            rules.push(rule);
        }
    }

    /// All collected rules, concatenated in registration order.
    pub fn css(&self) -> String {
        self.lock().join("\n")
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<String>> {
        self.rules
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
