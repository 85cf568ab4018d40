//! Facet activation: metrics snapshot to ordered active facets.

use super::rules::PersonaRules;
use super::types::{Facet, Metrics};

/// Voice used when no facet activates.
pub const DEFAULT_FACET: Facet = Facet::Iskra;

/// Active facets for `metrics`, ordered by the priority table.
///
/// A facet is active when any of its conditions holds. Facets missing from
/// the priority table follow the ranked ones in rule-table order.
pub fn select_facets(rules: &PersonaRules, metrics: &Metrics) -> Vec<Facet> {
    let mut active: Vec<Facet> = rules
        .facets
        .iter()
        .filter(|rule| {
            rule.conditions
                .iter()
                .any(|condition| condition.contains(metrics.get(condition.metric)))
        })
        .map(|rule| rule.facet)
        .collect();
    active.sort_by_key(|facet| rules.priority_rank(*facet));
    active
}

/// Evaluates facet rules and remembers the latest result.
#[derive(Debug, Clone, Default)]
pub struct FacetActivationEngine {
    rules: PersonaRules,
    last_active: Vec<Facet>,
}

impl FacetActivationEngine {
    pub fn new(rules: PersonaRules) -> Self {
        Self {
            rules,
            last_active: Vec::new(),
        }
    }

    pub fn select_facets(&mut self, metrics: &Metrics) -> Vec<Facet> {
        let active = select_facets(&self.rules, metrics);
        self.last_active.clone_from(&active);
        active
    }

    /// Highest-priority active facet, or the default voice.
    pub fn primary_facet(&mut self, metrics: &Metrics) -> Facet {
        self.select_facets(metrics)
            .first()
            .copied()
            .unwrap_or(DEFAULT_FACET)
    }

    /// Result of the most recent selection. Informational only.
    pub fn last_active(&self) -> &[Facet] {
        &self.last_active
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persona::rules::{Condition, FacetRule};
    use crate::persona::types::Metric;
    use proptest::prelude::*;
    use rstest::rstest;

    fn calm() -> Metrics {
        Metrics::new()
            .with(Metric::Trust, 0.9)
            .with(Metric::Clarity, 0.9)
    }

    #[test]
    fn pain_alone_activates_kain_after_anhantra() {
        let active = select_facets(
            &PersonaRules::default(),
            &Metrics::new().with(Metric::Pain, 0.9),
        );
        assert_eq!(active, vec![Facet::Anhantra, Facet::Kain, Facet::Sam]);
    }

    #[rstest]
    #[case(Metric::Pain, 0.7, vec![Facet::Kain])]
    #[case(Metric::Pain, 0.69, vec![Facet::Pino])]
    #[case(Metric::Pain, 0.5, vec![Facet::Pino])]
    #[case(Metric::Pain, 1.0, vec![Facet::Kain])]
    #[case(Metric::Chaos, 0.6, vec![Facet::Huyndun])]
    #[case(Metric::Drift, 0.3, vec![Facet::Iskriv])]
    #[case(Metric::Drift, 0.29, vec![])]
    fn half_open_boundaries(#[case] metric: Metric, #[case] value: f64, #[case] expected: Vec<Facet>) {
        let active = select_facets(&PersonaRules::default(), &calm().with(metric, value));
        assert_eq!(active, expected);
    }

    #[test]
    fn calm_metrics_fall_back_to_the_default_voice() {
        let mut engine = FacetActivationEngine::default();
        assert_eq!(engine.primary_facet(&calm()), DEFAULT_FACET);
        assert!(engine.last_active().is_empty());

        let low_trust = calm().with(Metric::Trust, 0.1).with(Metric::Drift, 0.5);
        assert_eq!(engine.primary_facet(&low_trust), Facet::Anhantra);
        assert_eq!(engine.last_active(), &[Facet::Anhantra, Facet::Iskriv]);
    }

    #[test]
    fn unranked_facets_follow_ranked_ones_in_table_order() {
        let mut rules = PersonaRules::default();
        rules.priority = vec![Facet::Sam];
        rules.facets.push(FacetRule {
            facet: Facet::Maki,
            conditions: vec![Condition {
                metric: Metric::Echo,
                min: 0.0,
                max: 1.0,
            }],
        });
        rules.facets.retain(|rule| rule.facet != Facet::Maki || !rule.conditions.is_empty());
        let active = select_facets(&rules, &Metrics::new().with(Metric::Pain, 0.9));
        assert_eq!(
            active,
            vec![Facet::Sam, Facet::Kain, Facet::Anhantra, Facet::Maki]
        );
    }

    fn metrics_strategy() -> impl Strategy<Value = Metrics> {
        prop::collection::vec(
            (prop::sample::select(Metric::ALL.to_vec()), 0.0f64..=1.0),
            0..8,
        )
        .prop_map(|pairs| pairs.into_iter().collect())
    }

    proptest! {
        #[test]
        fn selection_is_deterministic_and_priority_ordered(metrics in metrics_strategy()) {
            let rules = PersonaRules::default();
            let first = select_facets(&rules, &metrics);
            prop_assert_eq!(&first, &select_facets(&rules, &metrics));
            let ranks: Vec<usize> = first.iter().map(|f| rules.priority_rank(*f)).collect();
            prop_assert!(ranks.windows(2).all(|w| w[0] < w[1]));
            prop_assert!(!first.contains(&Facet::Iskra));
        }
    }
}
