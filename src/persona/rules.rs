//! Declarative facet and phase rules, loaded once at startup.
//!
//! Rule files are TOML:
//!
//! ```toml
//! version = 1
//! initial_phase = "Transition"
//! priority = ["Anhantra", "Kain", "Sam", "Iskra", "Iskriv", "Pino", "Huyndun", "Maki"]
//!
//! [[facets]]
//! facet = "Kain"
//! [[facets.conditions]]
//! metric = "pain"
//! min = 0.7
//! max = 1.01
//!
//! [[phase_guards]]
//! metric = "silence_mass"
//! above = 0.6
//! target = "Silence"
//! ```

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::types::{Facet, Metric, Phase};

/// Version written by [`PersonaRules::default`].
pub const RULES_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors encountered while loading or checking a rules file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RulesError {
    Io(String),
    Parse(String),
    Invalid(String),
}

impl std::fmt::Display for RulesError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(msg) => write!(f, "IO error: {msg}"),
            Self::Parse(msg) => write!(f, "TOML parse error: {msg}"),
            Self::Invalid(msg) => write!(f, "invalid persona rules: {msg}"),
        }
    }
}

impl std::error::Error for RulesError {}

// ---------------------------------------------------------------------------
// Rule types
// ---------------------------------------------------------------------------

/// Half-open activation interval `[min, max)` on one metric.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub metric: Metric,
    pub min: f64,
    pub max: f64,
}

impl Condition {
    pub fn contains(&self, value: f64) -> bool {
        self.min <= value && value < self.max
    }
}

/// A facet and the conditions that activate it. No conditions: never auto-activates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacetRule {
    pub facet: Facet,
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

/// `metric > above` moves the phase machine to `target`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhaseGuard {
    pub metric: Metric,
    pub above: f64,
    pub target: Phase,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonaRules {
    pub version: u32,
    pub initial_phase: Phase,
    /// Facet order for activation results; unlisted facets sort last.
    #[serde(default)]
    pub priority: Vec<Facet>,
    #[serde(default)]
    pub facets: Vec<FacetRule>,
    /// Evaluated in order; the first guard that fires wins.
    #[serde(default)]
    pub phase_guards: Vec<PhaseGuard>,
}

fn facet(facet: Facet, conditions: &[(Metric, f64, f64)]) -> FacetRule {
    FacetRule {
        facet,
        conditions: conditions
            .iter()
            .map(|&(metric, min, max)| Condition { metric, min, max })
            .collect(),
    }
}

impl Default for PersonaRules {
    fn default() -> Self {
        Self {
            version: RULES_VERSION,
            initial_phase: Phase::Transition,
            priority: vec![
                Facet::Anhantra,
                Facet::Kain,
                Facet::Sam,
                Facet::Iskra,
                Facet::Iskriv,
                Facet::Pino,
                Facet::Huyndun,
                Facet::Maki,
            ],
            facets: vec![
                facet(Facet::Kain, &[(Metric::Pain, 0.7, 1.01)]),
                facet(Facet::Pino, &[(Metric::Pain, 0.5, 0.7)]),
                facet(Facet::Sam, &[(Metric::Clarity, 0.0, 0.7)]),
                facet(Facet::Anhantra, &[(Metric::Trust, 0.0, 0.75)]),
                facet(Facet::Huyndun, &[(Metric::Chaos, 0.6, 1.01)]),
                facet(Facet::Iskriv, &[(Metric::Drift, 0.3, 1.01)]),
                facet(Facet::Iskra, &[]),
                facet(Facet::Maki, &[]),
            ],
            phase_guards: vec![
                PhaseGuard {
                    metric: Metric::SilenceMass,
                    above: 0.6,
                    target: Phase::Silence,
                },
                PhaseGuard {
                    metric: Metric::Chaos,
                    above: 0.6,
                    target: Phase::Transition,
                },
                PhaseGuard {
                    metric: Metric::Clarity,
                    above: 0.7,
                    target: Phase::Clarity,
                },
            ],
        }
    }
}

impl PersonaRules {
    /// Parse and check a TOML rules document.
    pub fn from_toml_str(content: &str) -> Result<Self, RulesError> {
        let rules: Self = toml::from_str(content).map_err(|e| RulesError::Parse(e.to_string()))?;
        rules.validate()?;
        Ok(rules)
    }

    /// Load rules from disk.
    pub fn load(path: &Path) -> Result<Self, RulesError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| RulesError::Io(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<(), RulesError> {
        let mut seen = HashSet::new();
        for rule in &self.facets {
            if !seen.insert(rule.facet) {
                return Err(RulesError::Invalid(format!(
                    "facet {} is listed twice",
                    rule.facet
                )));
            }
            for condition in &rule.conditions {
                if !condition.min.is_finite() || !condition.max.is_finite() {
                    return Err(RulesError::Invalid(format!(
                        "facet {} has a non-finite bound on {}",
                        rule.facet, condition.metric
                    )));
                }
                if condition.min >= condition.max {
                    return Err(RulesError::Invalid(format!(
                        "facet {} has an empty interval on {}: [{}, {})",
                        rule.facet, condition.metric, condition.min, condition.max
                    )));
                }
            }
        }

        let mut ranked = HashSet::new();
        if let Some(dup) = self.priority.iter().find(|facet| !ranked.insert(**facet)) {
            return Err(RulesError::Invalid(format!(
                "facet {dup} appears twice in priority"
            )));
        }

        if let Some(guard) = self.phase_guards.iter().find(|g| !g.above.is_finite()) {
            return Err(RulesError::Invalid(format!(
                "phase guard on {} has a non-finite threshold",
                guard.metric
            )));
        }
        Ok(())
    }

    /// Position in the priority table; unlisted facets share the last rank.
    pub fn priority_rank(&self, facet: Facet) -> usize {
        self.priority
            .iter()
            .position(|ranked| *ranked == facet)
            .unwrap_or(self.priority.len())
    }
}
