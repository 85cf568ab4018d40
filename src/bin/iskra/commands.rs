//! Subcommand handlers. Each prints exactly one JSON document on success.

use std::fs;
use std::io::{self, Read};
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Serialize;

use iskra::config::IskraConfig;
use iskra::memory::{
    ArchiveDraft, ConfidenceFilter, MemoryCore, RecordKind, SearchQuery, ShadowDraft,
    RULE_88_WINDOW, RULE_8_WINDOW,
};
use iskra::persona::{
    Facet, FacetActivationEngine, Metrics, MetricsCalculator, PersonaRules, Phase, PhaseManager,
    DEFAULT_FACET,
};
use iskra::telemetry::{ActivationTelemetry, TelemetrySnapshot};

use crate::cli::Command;

fn emit<T: Serialize>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("failed to serialize output")?;
    println!("{text}");
    Ok(())
}

fn read_input(file: Option<&Path>) -> Result<String> {
    match file {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display())),
        None => {
            let mut text = String::new();
            io::stdin()
                .read_to_string(&mut text)
                .context("failed to read stdin")?;
            Ok(text)
        }
    }
}

fn parse_metrics(raw: &str) -> Result<Metrics> {
    serde_json::from_str(raw).with_context(|| format!("invalid metrics JSON '{raw}'"))
}

fn search_query(
    tags: &[String],
    confidence: Option<f64>,
    min_confidence: Option<f64>,
    text: Option<&str>,
    owner: Option<&str>,
) -> SearchQuery {
    let mut query = tags
        .iter()
        .fold(SearchQuery::default(), |query, tag| query.tag(tag.as_str()));
    if let Some(value) = confidence {
        query = query.confidence(ConfidenceFilter::Exact(value));
    } else if let Some(floor) = min_confidence {
        query = query.confidence(ConfidenceFilter::AtLeast(floor));
    }
    if let Some(text) = text {
        query = query.text(text);
    }
    if let Some(owner) = owner {
        query = query.owner(owner);
    }
    query
}

pub(crate) fn run_memory(core: &MemoryCore, config: &IskraConfig, command: &Command) -> Result<()> {
    match command {
        Command::AddArchive {
            title,
            entry_type,
            content,
            tags,
            confidence,
            owner,
            evidence,
        } => {
            let mut draft = ArchiveDraft::new(title.as_str(), entry_type.as_str(), content.as_str())
                .tags(tags.iter().map(String::as_str))
                .confidence(*confidence)
                .evidence(evidence.iter().map(String::as_str));
            if let Some(owner) = owner {
                draft = draft.owner(owner.as_str());
            }
            let record = core.append_archive(draft)?;
            tracing::info!(id = record.id, "archive append");
            emit(&record)
        }
        Command::AddShadow {
            signal,
            hypothesis,
            counter,
            tags,
            confidence,
        } => {
            let mut draft = ShadowDraft::new(signal.as_str(), hypothesis.as_str())
                .tags(tags.iter().map(String::as_str))
                .confidence(*confidence);
            if let Some(counter) = counter {
                draft = draft.counter(counter.as_str());
            }
            let record = core.append_shadow(draft)?;
            tracing::info!(id = record.id, "shadow append");
            emit(&record)
        }
        Command::Search {
            kind,
            tags,
            confidence,
            min_confidence,
            text,
            owner,
        } => {
            let query = search_query(
                tags,
                *confidence,
                *min_confidence,
                text.as_deref(),
                owner.as_deref(),
            );
            match kind {
                RecordKind::Archive => {
                    let hits = core.search_archive(&query)?;
                    tracing::info!(kind = %kind, hits = hits.len(), "search");
                    emit(&hits)
                }
                RecordKind::Shadow => {
                    if owner.is_some() {
                        bail!("--owner applies to archive records only");
                    }
                    let hits = core.search_shadow(&query)?;
                    tracing::info!(kind = %kind, hits = hits.len(), "search");
                    emit(&hits)
                }
            }
        }
        Command::Stats => emit(&core.stats()?),
        Command::Validate { strict } => {
            let report = core.validate_all()?;
            tracing::info!(
                checked = report.checked,
                problems = report.problems.len(),
                "validate"
            );
            emit(&report)?;
            if *strict && !report.ok {
                bail!("{} problem(s) found", report.problems.len());
            }
            Ok(())
        }
        Command::Reindex => {
            let counts = core.reindex()?;
            tracing::info!(archive = counts.archive, shadow = counts.shadow, "reindex");
            emit(&counts)
        }
        Command::Dedupe => {
            let removed = core.dedupe()?;
            tracing::info!(archive = removed.archive, shadow = removed.shadow, "dedupe");
            emit(&removed)
        }
        Command::Compact { max_records } => {
            let max = max_records.unwrap_or(config.compact_max_records);
            let report = core.compact(max)?;
            tracing::info!(max, kept = report.kept, removed = report.removed, "compact");
            emit(&report)
        }
        Command::Upgrade => {
            let changed = core.upgrade()?;
            tracing::info!(archive = changed.archive, shadow = changed.shadow, "upgrade");
            emit(&changed)
        }
        Command::Stitch { rule88, window } => {
            let window = match (rule88, window) {
                (true, _) => RULE_88_WINDOW,
                (false, Some(n)) => *n,
                (false, None) => RULE_8_WINDOW,
            };
            let summary = core.stitch(window)?;
            tracing::info!(
                window,
                analysed = summary.analysed,
                insight = summary.insight_id,
                "stitch"
            );
            emit(&summary)
        }
        Command::ScanText { file } => {
            let text = read_input(file.as_deref())?;
            let scan = core.scan_transcript(&text)?;
            tracing::info!(lines = scan.lines, shadow = scan.shadow_id, "scan text");
            emit(&scan)
        }
        Command::ScanDir { dir } => {
            let scan = core
                .scan_directory(dir)
                .with_context(|| format!("failed to scan {}", dir.display()))?;
            tracing::info!(files = scan.files, shadow = scan.shadow_id, "scan dir");
            emit(&scan)
        }
        Command::Snapshot { dir } => {
            let report = core.snapshot(dir.as_deref())?;
            tracing::info!(path = %report.path.display(), "snapshot");
            emit(&report)
        }
        Command::Export { dest } => {
            let report = core
                .export(dest)
                .with_context(|| format!("failed to export to {}", dest.display()))?;
            emit(&report)
        }
        other => bail!("'{}' does not operate on memory", other.name()),
    }
}

#[derive(Debug, Serialize)]
struct FacetSelection {
    facets: Vec<Facet>,
    primary: Facet,
}

#[derive(Debug, Serialize)]
struct PhaseRun {
    phases: Vec<Phase>,
    current: Phase,
}

#[derive(Debug, Serialize)]
struct PersonaStep {
    line: usize,
    metrics: Metrics,
    facets: Vec<Facet>,
    primary: Facet,
    phase: Phase,
}

#[derive(Debug, Serialize)]
struct PersonaRun {
    steps: Vec<PersonaStep>,
    telemetry: TelemetrySnapshot,
}

pub(crate) fn run_persona(rules: &PersonaRules, command: &Command) -> Result<()> {
    match command {
        Command::Facets { metrics } => {
            let metrics = parse_metrics(metrics)?;
            let mut engine = FacetActivationEngine::new(rules.clone());
            let facets = engine.select_facets(&metrics);
            let primary = facets.first().copied().unwrap_or(DEFAULT_FACET);
            emit(&FacetSelection { facets, primary })
        }
        Command::Phase { start, metrics } => {
            let mut manager = match start {
                Some(phase) => PhaseManager::new(&PersonaRules {
                    initial_phase: *phase,
                    ..rules.clone()
                }),
                None => PhaseManager::new(rules),
            };
            let phases = metrics
                .iter()
                .map(|raw| parse_metrics(raw).map(|m| manager.step(&m)))
                .collect::<Result<Vec<_>>>()?;
            emit(&PhaseRun {
                phases,
                current: manager.phase(),
            })
        }
        Command::Metrics { text } => {
            let text = match text {
                Some(text) => text.clone(),
                None => read_input(None)?,
            };
            emit(&MetricsCalculator.from_text(&text))
        }
        Command::Persona { file, metrics_out } => {
            let input = read_input(file.as_deref())?;
            let mut engine = FacetActivationEngine::new(rules.clone());
            let mut manager = PhaseManager::new(rules);
            let mut telemetry =
                ActivationTelemetry::new().context("failed to register activation metrics")?;
            let mut steps = Vec::new();

            for (index, line) in input.lines().enumerate() {
                if line.trim().is_empty() {
                    continue;
                }
                let (metrics, facets, phase) = telemetry.timed(|| {
                    let metrics = MetricsCalculator.from_text(line);
                    let facets = engine.select_facets(&metrics);
                    let phase = manager.step(&metrics);
                    (metrics, facets, phase)
                });
                let primary = facets.first().copied().unwrap_or(DEFAULT_FACET);
                telemetry.record_facet(primary);
                telemetry.record_phase(phase);
                steps.push(PersonaStep {
                    line: index + 1,
                    metrics,
                    facets,
                    primary,
                    phase,
                });
            }
            if let Some(path) = metrics_out {
                let text = telemetry
                    .render_text()
                    .context("failed to encode activation metrics")?;
                fs::write(path, text)
                    .with_context(|| format!("failed to write {}", path.display()))?;
            }
            emit(&PersonaRun {
                steps,
                telemetry: telemetry.snapshot(),
            })
        }
        other => bail!("'{}' requires the memory logs", other.name()),
    }
}
