//! Persona engines: facet activation and the phase state machine.
//!
//! Both are pure evaluators over [`PersonaRules`]; neither touches the
//! memory logs.

mod facets;
mod metrics;
mod phase;
pub mod rules;
pub mod types;

pub use facets::{select_facets, FacetActivationEngine, DEFAULT_FACET};
pub use metrics::MetricsCalculator;
pub use phase::PhaseManager;
pub use rules::{Condition, FacetRule, PersonaRules, PhaseGuard, RulesError, RULES_VERSION};
pub use types::{Facet, Metric, Metrics, Phase};
