//! Scenario simulation modules
//!
//! Each scenario builds its own engine from the configuration, drives it and
//! reports whether every check held.

pub mod contention;
pub mod lifecycle;
pub mod random_flow;

use crate::audit::Violation;
use crate::config::SimulationConfig;
use serde::{Deserialize, Serialize};

/// Result of a scenario run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub name: String,
    pub orders_created: u64,
    pub orders_matched: u64,
    pub orders_canceled: u64,
    /// Requests the engine refused with a business error
    pub orders_rejected: u64,
    pub passed: bool,
    pub failures: Vec<String>,
    pub details: String,
}

impl ScenarioResult {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// Record a failed check unless `ok`.
    fn check(&mut self, ok: bool, what: impl FnOnce() -> String) {
        if !ok {
            self.failures.push(what());
        }
    }

    fn record_violations(&mut self, step: &str, violations: Vec<Violation>) {
        for v in violations {
            self.failures
                .push(format!("{}: {}/{}: {}", step, v.customer_id, v.asset, v.detail));
        }
    }

    fn finish(mut self, details: String) -> Self {
        self.passed = self.failures.is_empty();
        self.details = details;
        self
    }
}

/// Which scenarios to run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioKind {
    Lifecycle,
    RandomFlow,
    Contention,
}

impl ScenarioKind {
    pub const ALL: [ScenarioKind; 3] = [
        ScenarioKind::Lifecycle,
        ScenarioKind::RandomFlow,
        ScenarioKind::Contention,
    ];

    pub fn run(self, config: &SimulationConfig) -> ScenarioResult {
        match self {
            ScenarioKind::Lifecycle => lifecycle::run(config),
            ScenarioKind::RandomFlow => random_flow::run(config),
            ScenarioKind::Contention => contention::run(config),
        }
    }
}
