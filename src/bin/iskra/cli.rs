//! CLI flag schema: global memory/config flags plus one subcommand per operation.

use clap::{Parser, Subcommand};
use iskra::memory::RecordKind;
use iskra::persona::Phase;
use std::path::PathBuf;

#[derive(Debug, Parser, Clone)]
#[command(
    about = "Iskra Archive/Shadow memory and persona tools",
    author,
    version
)]
pub(crate) struct Cli {
    /// Memory root holding ARCHIVE/ and SHADOW/ (overrides the config file)
    #[arg(long = "memory", env = "ISKRA_MEMORY_DIR", global = true)]
    pub(crate) memory: Option<PathBuf>,

    /// Archive log path (overrides the layout under --memory)
    #[arg(long = "archive", global = true)]
    pub(crate) archive: Option<PathBuf>,

    /// Shadow log path (overrides the layout under --memory)
    #[arg(long = "shadow", global = true)]
    pub(crate) shadow: Option<PathBuf>,

    /// Config file (defaults to <config dir>/iskra/config.toml)
    #[arg(long = "config", global = true)]
    pub(crate) config: Option<PathBuf>,

    /// Persona rules TOML (defaults to the built-in tables)
    #[arg(long = "rules", global = true)]
    pub(crate) rules: Option<PathBuf>,

    /// Write JSON trace events (path from ISKRA_TRACE_LOG)
    #[arg(long = "logs", default_value_t = false, global = true)]
    pub(crate) logs: bool,

    /// Disable trace logging even when the config file enables it
    #[arg(long = "no-logs", default_value_t = false, global = true)]
    pub(crate) no_logs: bool,

    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub(crate) enum Command {
    /// Append a validated Archive entry
    AddArchive {
        #[arg(long = "title")]
        title: String,
        /// Entry type (fact, decision, question, insight, ...)
        #[arg(long = "type")]
        entry_type: String,
        #[arg(long = "content")]
        content: String,
        /// Repeatable
        #[arg(long = "tag")]
        tags: Vec<String>,
        #[arg(long = "confidence", default_value_t = 0.75)]
        confidence: f64,
        #[arg(long = "owner")]
        owner: Option<String>,
        /// Repeatable
        #[arg(long = "evidence")]
        evidence: Vec<String>,
    },

    /// Append a Shadow hypothesis
    AddShadow {
        #[arg(long = "signal")]
        signal: String,
        #[arg(long = "hypothesis")]
        hypothesis: String,
        #[arg(long = "counter")]
        counter: Option<String>,
        /// Repeatable
        #[arg(long = "tag")]
        tags: Vec<String>,
        #[arg(long = "confidence", default_value_t = 0.5)]
        confidence: f64,
    },

    /// Filter one log by tags, confidence, text and owner
    Search {
        /// archive or shadow
        #[arg(long = "kind", default_value = "archive")]
        kind: RecordKind,
        /// Repeatable; every tag must be present
        #[arg(long = "tag")]
        tags: Vec<String>,
        /// Exact confidence match
        #[arg(long = "confidence", conflicts_with = "min_confidence")]
        confidence: Option<f64>,
        #[arg(long = "min-confidence")]
        min_confidence: Option<f64>,
        /// Case-insensitive substring
        #[arg(long = "text")]
        text: Option<String>,
        /// Archive only
        #[arg(long = "owner")]
        owner: Option<String>,
    },

    /// Record counts, top tags and average Archive confidence
    Stats,

    /// Report every structural problem in both logs
    Validate {
        /// Exit non-zero when any problem is found
        #[arg(long = "strict", default_value_t = false)]
        strict: bool,
    },

    /// Renumber ids to 1..N in file order
    Reindex,

    /// Drop records whose content key repeats an earlier one
    Dedupe,

    /// Keep only the highest-ranked Archive records
    Compact {
        /// Defaults to the config value
        #[arg(long = "max-records")]
        max_records: Option<usize>,
    },

    /// Fill in missing review schedules under the current rules
    Upgrade,

    /// Summarize the most recent Archive entries into an insight
    Stitch {
        /// Use the 88-entry window
        #[arg(long = "rule88", default_value_t = false, conflicts_with = "window")]
        rule88: bool,
        /// Explicit window size (default 8)
        #[arg(long = "window")]
        window: Option<usize>,
    },

    /// Scan a transcript (file or stdin) and record a Shadow insight
    ScanText {
        #[arg(long = "file")]
        file: Option<PathBuf>,
    },

    /// Scan .log/.txt files under a directory and record a Shadow pattern
    ScanDir { dir: PathBuf },

    /// Write both logs to a new timestamped snapshot file
    Snapshot {
        /// Defaults to the backups directory
        #[arg(long = "dir")]
        dir: Option<PathBuf>,
    },

    /// Write both logs to an explicit JSON file
    Export { dest: PathBuf },

    /// Active facets for a JSON metrics object, e.g. '{"pain": 0.9}'
    Facets { metrics: String },

    /// Step the phase machine through one or more JSON metrics objects
    Phase {
        /// Starting phase (defaults to the rules' initial phase)
        #[arg(long = "start")]
        start: Option<Phase>,
        #[arg(required = true)]
        metrics: Vec<String>,
    },

    /// Heuristic metrics for text (argument or stdin)
    Metrics { text: Option<String> },

    /// Run text lines through metrics, facets and phase with switch telemetry
    Persona {
        #[arg(long = "file")]
        file: Option<PathBuf>,
        /// Also write the Prometheus text exposition of the run here
        #[arg(long = "metrics-out")]
        metrics_out: Option<PathBuf>,
    },
}

impl Command {
    pub(crate) fn name(&self) -> &'static str {
        match self {
            Command::AddArchive { .. } => "add-archive",
            Command::AddShadow { .. } => "add-shadow",
            Command::Search { .. } => "search",
            Command::Stats => "stats",
            Command::Validate { .. } => "validate",
            Command::Reindex => "reindex",
            Command::Dedupe => "dedupe",
            Command::Compact { .. } => "compact",
            Command::Upgrade => "upgrade",
            Command::Stitch { .. } => "stitch",
            Command::ScanText { .. } => "scan-text",
            Command::ScanDir { .. } => "scan-dir",
            Command::Snapshot { .. } => "snapshot",
            Command::Export { .. } => "export",
            Command::Facets { .. } => "facets",
            Command::Phase { .. } => "phase",
            Command::Metrics { .. } => "metrics",
            Command::Persona { .. } => "persona",
        }
    }

    /// Persona commands never open the memory logs.
    pub(crate) fn uses_memory(&self) -> bool {
        !matches!(
            self,
            Command::Facets { .. }
                | Command::Phase { .. }
                | Command::Metrics { .. }
                | Command::Persona { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn schema_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_follow_the_subcommand() {
        let cli = Cli::parse_from(["iskra", "stats", "--memory", "/tmp/m", "--logs"]);
        assert_eq!(cli.memory, Some(PathBuf::from("/tmp/m")));
        assert!(cli.logs);
        assert!(matches!(cli.command, Command::Stats));
    }

    #[test]
    fn add_archive_collects_repeated_tags() {
        let cli = Cli::parse_from([
            "iskra",
            "add-archive",
            "--title",
            "t",
            "--type",
            "fact",
            "--content",
            "c",
            "--tag",
            "a",
            "--tag",
            "b",
        ]);
        match cli.command {
            Command::AddArchive {
                tags, confidence, ..
            } => {
                assert_eq!(tags, vec!["a".to_string(), "b".to_string()]);
                assert_eq!(confidence, 0.75);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn names_parse_through_from_str() {
        let cli = Cli::parse_from(["iskra", "search", "--kind", "shadow"]);
        assert!(matches!(
            cli.command,
            Command::Search {
                kind: RecordKind::Shadow,
                ..
            }
        ));

        let cli = Cli::parse_from(["iskra", "phase", "--start", "Darkness", "{}"]);
        assert!(matches!(
            cli.command,
            Command::Phase {
                start: Some(Phase::Darkness),
                ..
            }
        ));
        assert!(Cli::try_parse_from(["iskra", "search", "--kind", "ledger"]).is_err());
        assert!(Cli::try_parse_from(["iskra", "phase", "--start", "Dawn", "{}"]).is_err());
    }

    #[test]
    fn stitch_window_flags_conflict() {
        let parsed = Cli::try_parse_from(["iskra", "stitch", "--rule88", "--window", "3"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn search_defaults_to_archive() {
        let cli = Cli::parse_from(["iskra", "search", "--tag", "x"]);
        match cli.command {
            Command::Search { kind, tags, .. } => {
                assert_eq!(kind, RecordKind::Archive);
                assert_eq!(tags, vec!["x".to_string()]);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
