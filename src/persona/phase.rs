//! Phase state machine driven by ordered guards.

use super::rules::{PersonaRules, PhaseGuard};
use super::types::{Metrics, Phase};

/// Holds the current phase; `step` is the only mutator.
#[derive(Debug, Clone)]
pub struct PhaseManager {
    phase: Phase,
    guards: Vec<PhaseGuard>,
}

impl Default for PhaseManager {
    fn default() -> Self {
        Self::new(&PersonaRules::default())
    }
}

impl PhaseManager {
    pub fn new(rules: &PersonaRules) -> Self {
        Self {
            phase: rules.initial_phase,
            guards: rules.phase_guards.clone(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Apply the first guard whose metric exceeds its threshold. No match
    /// leaves the phase unchanged.
    pub fn step(&mut self, metrics: &Metrics) -> Phase {
        if let Some(guard) = self
            .guards
            .iter()
            .find(|guard| metrics.get(guard.metric) > guard.above)
        {
            self.phase = guard.target;
        }
        self.phase
    }
}
