//! Heuristic metrics from raw text, for driving the engines from a transcript.

use super::types::{Metric, Metrics};

const BASELINE: [(Metric, f64); 6] = [
    (Metric::Trust, 0.9),
    (Metric::Clarity, 0.6),
    (Metric::Pain, 0.0),
    (Metric::Drift, 0.0),
    (Metric::Chaos, 0.3),
    (Metric::SilenceMass, 0.0),
];

const PAIN_CUES: &[&str] = &["больно", "∆", "hurts"];
const CONFUSION_CUES: &[&str] = &["не понимаю", "???", "don't understand"];
const DEFERRAL_CUES: &[&str] = &["потом", "later"];

const PAIN_STEP: f64 = 0.7;
const CONFUSION_STEP: f64 = 0.3;
const DEFERRAL_STEP: f64 = 0.4;

#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsCalculator;

impl MetricsCalculator {
    pub fn from_text(&self, text: &str) -> Metrics {
        let lowered = text.to_lowercase();
        let mentions = |cues: &[&str]| cues.iter().any(|cue| lowered.contains(cue));
        let mut metrics: Metrics = BASELINE.into_iter().collect();

        if mentions(PAIN_CUES) {
            nudge(&mut metrics, Metric::Pain, PAIN_STEP);
        }
        if mentions(CONFUSION_CUES) {
            nudge(&mut metrics, Metric::Clarity, -CONFUSION_STEP);
        }
        if mentions(DEFERRAL_CUES) {
            nudge(&mut metrics, Metric::Drift, DEFERRAL_STEP);
        }
        metrics
    }
}

fn nudge(metrics: &mut Metrics, metric: Metric, delta: f64) {
    let value = (metrics.get(metric) + delta).clamp(0.0, 1.0);
    metrics.set(metric, value);
}
