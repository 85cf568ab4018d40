//! Persistent config (`~/.config/iskra/config.toml`) for memory locations and logging.
//!
//! A missing file yields defaults. CLI flags always take precedence over values
//! read here; the binary applies them after `load`.

use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::memory::governance::MEMORY_DIR;
use crate::memory::{MemoryPaths, DEFAULT_MAX_RECORDS};

const CONFIG_FILE: &str = "config.toml";
const CONFIG_DIR_ENV: &str = "ISKRA_CONFIG_DIR";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Io(String),
    Parse(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(msg) => write!(f, "IO error: {msg}"),
            Self::Parse(msg) => write!(f, "TOML parse error: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IskraConfig {
    pub memory_root: PathBuf,
    /// Overrides `<memory_root>/ARCHIVE/main_archive.jsonl`.
    pub archive_path: Option<PathBuf>,
    /// Overrides `<memory_root>/SHADOW/main_shadow.jsonl`.
    pub shadow_path: Option<PathBuf>,
    /// Snapshot directory; defaults to `backups` beside the Archive log.
    pub backups_dir: Option<PathBuf>,
    pub compact_max_records: usize,
    /// Persona rules TOML; built-in tables when unset.
    pub rules_path: Option<PathBuf>,
    pub logs: bool,
}

impl Default for IskraConfig {
    fn default() -> Self {
        Self {
            memory_root: PathBuf::from(".").join(MEMORY_DIR),
            archive_path: None,
            shadow_path: None,
            backups_dir: None,
            compact_max_records: DEFAULT_MAX_RECORDS,
            rules_path: None,
            logs: false,
        }
    }
}

impl IskraConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Read `path`; a missing file is not an error.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match fs::read_to_string(path) {
            Ok(content) => Self::from_toml_str(&content),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(format!("{}: {err}", path.display()))),
        }
    }

    /// Load from the default location, or defaults when no config dir resolves.
    pub fn load() -> Result<Self, ConfigError> {
        match config_file_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// Resolve log and snapshot locations from the root and any overrides.
    pub fn memory_paths(&self) -> MemoryPaths {
        let defaults = MemoryPaths::under(&self.memory_root);
        let archive = self.archive_path.clone().unwrap_or(defaults.archive);
        let shadow = self.shadow_path.clone().unwrap_or(defaults.shadow);
        let paths = MemoryPaths::new(archive, shadow);
        match &self.backups_dir {
            Some(dir) => paths.with_backups(dir.clone()),
            None => paths,
        }
    }
}

/// `ISKRA_CONFIG_DIR` when set, else the platform config dir plus `iskra`.
pub fn config_dir() -> Option<PathBuf> {
    if let Ok(dir) = env::var(CONFIG_DIR_ENV) {
        let trimmed = dir.trim();
        if !trimmed.is_empty() {
            return Some(PathBuf::from(trimmed));
        }
    }
    dirs::config_dir().map(|dir| dir.join("iskra"))
}

pub fn config_file_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join(CONFIG_FILE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Mutex, OnceLock};
    use std::time::{SystemTime, UNIX_EPOCH};

    fn env_lock() -> &'static Mutex<()> {
        static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        LOCK.get_or_init(|| Mutex::new(()))
    }

    fn unique_dir(label: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time should be after epoch")
            .as_nanos();
        env::temp_dir().join(format!("iskra-config-{label}-{nanos}"))
    }

    #[test]
    fn defaults_use_the_standard_layout() {
        let config = IskraConfig::default();
        let paths = config.memory_paths();
        assert_eq!(paths, MemoryPaths::under(Path::new("./memory")));
        assert_eq!(config.compact_max_records, 10_000);
        assert!(!config.logs);
    }

    #[test]
    fn overrides_replace_individual_paths() {
        let config = IskraConfig::from_toml_str(
            r#"
memory_root = "/srv/iskra"
shadow_path = "/tmp/shadow.jsonl"
backups_dir = "/var/backups/iskra"
compact_max_records = 50
logs = true
"#,
        )
        .expect("parse config");
        let paths = config.memory_paths();
        assert_eq!(
            paths.archive,
            PathBuf::from("/srv/iskra/ARCHIVE/main_archive.jsonl")
        );
        assert_eq!(paths.shadow, PathBuf::from("/tmp/shadow.jsonl"));
        assert_eq!(paths.backups, PathBuf::from("/var/backups/iskra"));
        assert_eq!(config.compact_max_records, 50);
        assert!(config.logs);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = IskraConfig::from_toml_str("memroy_root = \"x\"\n").expect_err("typo");
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = unique_dir("missing");
        let loaded = IskraConfig::load_from(&dir.join(CONFIG_FILE)).expect("load");
        assert_eq!(loaded, IskraConfig::default());
    }

    #[test]
    fn load_reads_the_env_config_dir() {
        let _guard = env_lock().lock().expect("env lock");
        let dir = unique_dir("env");
        fs::create_dir_all(&dir).expect("create config dir");
        fs::write(dir.join(CONFIG_FILE), "compact_max_records = 7\n").expect("write config");
        unsafe {
            env::set_var(CONFIG_DIR_ENV, &dir);
        }
        assert_eq!(config_file_path(), Some(dir.join(CONFIG_FILE)));
        let loaded = IskraConfig::load().expect("load");
        assert_eq!(loaded.compact_max_records, 7);
        unsafe {
            env::remove_var(CONFIG_DIR_ENV);
        }
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn blank_env_dir_falls_back_to_platform_dir() {
        let _guard = env_lock().lock().expect("env lock");
        unsafe {
            env::set_var(CONFIG_DIR_ENV, "   ");
        }
        assert_eq!(config_dir(), dirs::config_dir().map(|dir| dir.join("iskra")));
        unsafe {
            env::remove_var(CONFIG_DIR_ENV);
        }
    }
}
