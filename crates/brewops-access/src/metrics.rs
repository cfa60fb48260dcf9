//! ---
//! brew_section: "06-security-access-control"
//! brew_subsection: "module"
//! brew_type: "source"
//! brew_scope: "code"
//! brew_description: "Prometheus counters for access decisions."
//! brew_version: "v0.0.0-prealpha"
//! brew_owner: "tbd"
//! ---
use std::fmt;
use std::sync::Arc;

use prometheus::{IntCounter, IntCounterVec, Opts, Registry};

use crate::guard::AccessDecision;

/// Access metrics exported via Prometheus.
#[derive(Clone)]
pub struct AccessMetrics {
    registry: Arc<Registry>,
    decisions_total: IntCounterVec,
    sign_in_redirects_total: IntCounter,
    session_resets_total: IntCounter,
}

impl AccessMetrics {
    /// Register metrics with the provided registry.
    pub fn new(registry: Arc<Registry>) -> anyhow::Result<Self> {
        let decisions_total = IntCounterVec::new(
            Opts::new(
                "brewops_access_decisions_total",
                "Route guard decisions by outcome",
            ),
            &["outcome"],
        )?;
        let sign_in_redirects_total = IntCounter::new(
            "brewops_sign_in_redirects_total",
            "Redirects to the sign-in entry point",
        )?;
        let session_resets_total = IntCounter::new(
            "brewops_session_resets_total",
            "Sessions cleared by logout or rejected credentials",
        )?;

        registry.register(Box::new(decisions_total.clone()))?;
        registry.register(Box::new(sign_in_redirects_total.clone()))?;
        registry.register(Box::new(session_resets_total.clone()))?;

        Ok(Self {
            registry,
            decisions_total,
            sign_in_redirects_total,
            session_resets_total,
        })
    }

    /// Access the underlying registry.
    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }

    /// Count a guard decision.
    pub fn observe(&self, decision: &AccessDecision) {
        self.decisions_total
            .with_label_values(&[decision.outcome().as_str()])
            .inc();
    }

    pub fn inc_redirect(&self) {
        self.sign_in_redirects_total.inc();
    }

    pub fn inc_session_reset(&self) {
        self.session_resets_total.inc();
    }
}

impl fmt::Debug for AccessMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessMetrics").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decisions_are_labelled_by_outcome() {
        let registry = Arc::new(Registry::new());
        let metrics = AccessMetrics::new(registry.clone()).unwrap();
        metrics.observe(&AccessDecision::Allowed);
        metrics.observe(&AccessDecision::Denied);
        metrics.observe(&AccessDecision::Denied);
        metrics.inc_redirect();
        metrics.inc_session_reset();

        let families = registry.gather();
        assert_eq!(families.len(), 3);
        let decisions = families
            .iter()
            .find(|family| family.get_name() == "brewops_access_decisions_total")
            .unwrap();
        let denied = decisions
            .get_metric()
            .iter()
            .find(|metric| metric.get_label()[0].get_value() == "denied")
            .unwrap();
        assert_eq!(denied.get_counter().get_value() as u64, 2);
    }

    #[test]
    fn duplicate_registration_fails() {
        let registry = Arc::new(Registry::new());
        AccessMetrics::new(registry.clone()).unwrap();
        assert!(AccessMetrics::new(registry).is_err());
    }
}
