//! Optional local trace logging plus Prometheus activation metrics.
//!
//! Nothing under `memory` or `persona` calls into this module. Callers wrap
//! engine calls with [`ActivationTelemetry`] and decide whether tracing is on.

use std::collections::BTreeMap;
use std::env;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounterVec, Opts, Registry, TextEncoder,
};
use serde::Serialize;
use tracing_subscriber::fmt::time::UtcTime;

use crate::persona::{Facet, Phase};

static TRACING_INIT: OnceLock<()> = OnceLock::new();

pub fn tracing_log_path() -> PathBuf {
    env::var("ISKRA_TRACE_LOG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| env::temp_dir().join("iskra_trace.jsonl"))
}

#[inline]
pub fn tracing_enabled(logs: bool, no_logs: bool) -> bool {
    logs && !no_logs
}

fn init_tracing_once(enabled: bool, once: &OnceLock<()>) {
    if !enabled {
        return;
    }

    let _ = once.get_or_init(|| {
        let path = tracing_log_path();
        let file = match OpenOptions::new().create(true).append(true).open(&path) {
            Ok(file) => file,
            Err(_) => return,
        };
        let subscriber = tracing_subscriber::fmt()
            .json()
            .with_timer(UtcTime::rfc_3339())
            .with_writer(file)
            .with_current_span(false)
            .with_span_list(false)
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    });
}

/// Install the JSON trace subscriber once per process when `enabled`.
pub fn init_tracing(enabled: bool) {
    init_tracing_once(enabled, &TRACING_INIT);
}

/// Counter and histogram values read back from the registry.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TelemetrySnapshot {
    pub facet_switches: BTreeMap<Facet, u64>,
    pub phase_switches: BTreeMap<Phase, u64>,
    pub activations: u64,
    pub activation_seconds: f64,
}

/// Facet and phase switch counters with an activation latency histogram,
/// registered in a private [`Registry`].
///
/// A switch is counted when the observed value differs from the previous
/// observation; the first observation always counts.
pub struct ActivationTelemetry {
    registry: Registry,
    facet_switches: IntCounterVec,
    phase_switches: IntCounterVec,
    activation_latency: Histogram,
    last_facet: Option<Facet>,
    last_phase: Option<Phase>,
}

impl ActivationTelemetry {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();
        let facet_switches = IntCounterVec::new(
            Opts::new("iskra_facet_switch_total", "Facet switches"),
            &["facet"],
        )?;
        let phase_switches = IntCounterVec::new(
            Opts::new("iskra_phase_switch_total", "Phase switches"),
            &["phase"],
        )?;
        let activation_latency = Histogram::with_opts(HistogramOpts::new(
            "iskra_activation_latency_seconds",
            "Latency of activation flow",
        ))?;
        registry.register(Box::new(facet_switches.clone()))?;
        registry.register(Box::new(phase_switches.clone()))?;
        registry.register(Box::new(activation_latency.clone()))?;
        Ok(Self {
            registry,
            facet_switches,
            phase_switches,
            activation_latency,
            last_facet: None,
            last_phase: None,
        })
    }

    /// Returns true when `facet` replaced a different primary facet.
    pub fn record_facet(&mut self, facet: Facet) -> bool {
        if self.last_facet == Some(facet) {
            return false;
        }
        let from = self.last_facet.replace(facet);
        self.facet_switches
            .with_label_values(&[facet.as_str()])
            .inc();
        tracing::info!(
            from = from.map(Facet::as_str),
            to = facet.as_str(),
            "facet switch"
        );
        true
    }

    pub fn record_phase(&mut self, phase: Phase) -> bool {
        if self.last_phase == Some(phase) {
            return false;
        }
        let from = self.last_phase.replace(phase);
        self.phase_switches
            .with_label_values(&[phase.as_str()])
            .inc();
        tracing::info!(
            from = from.map(Phase::as_str),
            to = phase.as_str(),
            "phase switch"
        );
        true
    }

    pub fn observe_latency(&self, elapsed: Duration) {
        self.activation_latency.observe(elapsed.as_secs_f64());
        tracing::debug!(elapsed_us = elapsed.as_micros() as u64, "activation");
    }

    /// Run `op` and record its wall time.
    pub fn timed<T>(&self, op: impl FnOnce() -> T) -> T {
        let started = Instant::now();
        let out = op();
        self.observe_latency(started.elapsed());
        out
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        let facet_switches = Facet::ALL
            .into_iter()
            .map(|facet| {
                let count = self.facet_switches.with_label_values(&[facet.as_str()]).get();
                (facet, count)
            })
            .filter(|(_, count)| *count > 0)
            .collect();
        let phase_switches = Phase::ALL
            .into_iter()
            .map(|phase| {
                let count = self.phase_switches.with_label_values(&[phase.as_str()]).get();
                (phase, count)
            })
            .filter(|(_, count)| *count > 0)
            .collect();
        TelemetrySnapshot {
            facet_switches,
            phase_switches,
            activations: self.activation_latency.get_sample_count(),
            activation_seconds: self.activation_latency.get_sample_sum(),
        }
    }

    /// Prometheus text exposition of every registered metric.
    pub fn render_text(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|err| prometheus::Error::Msg(err.to_string()))
    }
}
