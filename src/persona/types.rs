//! Closed vocabularies for the persona engines: facets, phases and metrics.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A named behavioral mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Facet {
    Kain,
    Pino,
    Sam,
    Anhantra,
    Huyndun,
    Iskriv,
    Iskra,
    Maki,
}

impl Facet {
    pub const ALL: [Self; 8] = [
        Self::Kain,
        Self::Pino,
        Self::Sam,
        Self::Anhantra,
        Self::Huyndun,
        Self::Iskriv,
        Self::Iskra,
        Self::Maki,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Kain => "Kain",
            Self::Pino => "Pino",
            Self::Sam => "Sam",
            Self::Anhantra => "Anhantra",
            Self::Huyndun => "Huyndun",
            Self::Iskriv => "Iskriv",
            Self::Iskra => "Iskra",
            Self::Maki => "Maki",
        }
    }
}

impl FromStr for Facet {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|facet| facet.as_str() == s)
            .ok_or_else(|| format!("unknown facet '{s}'"))
    }
}

impl fmt::Display for Facet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A point in the phase state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Phase {
    Darkness,
    Transition,
    Clarity,
    Echo,
    Silence,
    Experiment,
    Dissolution,
    Realization,
}

impl Phase {
    pub const ALL: [Self; 8] = [
        Self::Darkness,
        Self::Transition,
        Self::Clarity,
        Self::Echo,
        Self::Silence,
        Self::Experiment,
        Self::Dissolution,
        Self::Realization,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Darkness => "Darkness",
            Self::Transition => "Transition",
            Self::Clarity => "Clarity",
            Self::Echo => "Echo",
            Self::Silence => "Silence",
            Self::Experiment => "Experiment",
            Self::Dissolution => "Dissolution",
            Self::Realization => "Realization",
        }
    }
}

impl FromStr for Phase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|phase| phase.as_str() == s)
            .ok_or_else(|| format!("unknown phase '{s}'"))
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scalar behavioral signal fed to the engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Trust,
    Clarity,
    Pain,
    Drift,
    Chaos,
    Echo,
    SilenceMass,
    MirrorSync,
}

impl Metric {
    pub const ALL: [Self; 8] = [
        Self::Trust,
        Self::Clarity,
        Self::Pain,
        Self::Drift,
        Self::Chaos,
        Self::Echo,
        Self::SilenceMass,
        Self::MirrorSync,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Trust => "trust",
            Self::Clarity => "clarity",
            Self::Pain => "pain",
            Self::Drift => "drift",
            Self::Chaos => "chaos",
            Self::Echo => "echo",
            Self::SilenceMass => "silence_mass",
            Self::MirrorSync => "mirror_sync",
        }
    }
}

impl FromStr for Metric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|metric| metric.as_str() == s)
            .ok_or_else(|| format!("unknown metric '{s}'"))
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metrics snapshot. Unspecified metrics read as 0.0.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metrics(BTreeMap<Metric, f64>);

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, metric: Metric) -> f64 {
        self.0.get(&metric).copied().unwrap_or(0.0)
    }

    pub fn set(&mut self, metric: Metric, value: f64) {
        self.0.insert(metric, value);
    }

    #[must_use]
    pub fn with(mut self, metric: Metric, value: f64) -> Self {
        self.set(metric, value);
        self
    }
}

impl FromIterator<(Metric, f64)> for Metrics {
    fn from_iter<I: IntoIterator<Item = (Metric, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
