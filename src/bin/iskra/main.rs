//! Iskra command-line entrypoint.
//!
//! Resolves config (file, then CLI flags), optionally installs JSON tracing,
//! and runs one memory or persona command. Results print as pretty JSON on
//! stdout; failures exit non-zero with the error chain on stderr.

mod cli;
mod commands;

use anyhow::{bail, Context, Result};
use clap::Parser;
use iskra::config::IskraConfig;
use iskra::memory::MemoryCore;
use iskra::persona::PersonaRules;
use iskra::telemetry::{init_tracing, tracing_enabled};

use crate::cli::Cli;

fn resolve_config(cli: &Cli) -> Result<IskraConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            if !path.is_file() {
                bail!("config file '{}' does not exist", path.display());
            }
            IskraConfig::load_from(path)
        }
        None => IskraConfig::load(),
    }
    .context("failed to load config")?;

    if let Some(root) = &cli.memory {
        config.memory_root = root.clone();
    }
    if let Some(path) = &cli.archive {
        config.archive_path = Some(path.clone());
    }
    if let Some(path) = &cli.shadow {
        config.shadow_path = Some(path.clone());
    }
    if let Some(path) = &cli.rules {
        config.rules_path = Some(path.clone());
    }
    Ok(config)
}

fn load_rules(config: &IskraConfig) -> Result<PersonaRules> {
    match &config.rules_path {
        Some(path) => PersonaRules::load(path)
            .with_context(|| format!("failed to load persona rules from {}", path.display())),
        None => Ok(PersonaRules::default()),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = resolve_config(&cli)?;
    init_tracing(tracing_enabled(cli.logs || config.logs, cli.no_logs));

    let span = tracing::info_span!("command", name = cli.command.name());
    let _entered = span.enter();

    if cli.command.uses_memory() {
        let paths = config.memory_paths();
        let core = MemoryCore::open(&paths).with_context(|| {
            format!(
                "failed to open memory logs {} and {}",
                paths.archive.display(),
                paths.shadow.display()
            )
        })?;
        tracing::debug!(
            archive = %paths.archive.display(),
            shadow = %paths.shadow.display(),
            "memory opened"
        );
        commands::run_memory(&core, &config, &cli.command)
    } else {
        let rules = load_rules(&config)?;
        commands::run_persona(&rules, &cli.command)
    }
}
