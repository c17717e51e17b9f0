//! Runtime start configuration and its resolution from [`FetchOptions`]

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::{FetchOptions, WfetchError, WfetchResult};

/// Config files probed, in order, when none is given explicitly
pub const CONFIG_CANDIDATES: [&str; 3] = ["wrangler.json", "wrangler.jsonc", "wrangler.toml"];

/// Fallback used when no candidate exists
pub const DEFAULT_CONFIG: &str = "wrangler.json";

/// How the worker runtime should be started
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerSource {
    /// Start directly from an entry script
    Script(PathBuf),
    /// Start from a wrangler config file
    Config(PathBuf),
}

impl WorkerSource {
    /// Config path, if this source names one
    pub fn config_path(&self) -> Option<&Path> {
        match self {
            WorkerSource::Config(path) => Some(path),
            WorkerSource::Script(_) => None,
        }
    }
}

/// Runtime log verbosity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DevLogLevel {
    None,
    Error,
    Warn,
    Info,
    Log,
    Debug,
}

impl std::fmt::Display for DevLogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DevLogLevel::None => write!(f, "none"),
            DevLogLevel::Error => write!(f, "error"),
            DevLogLevel::Warn => write!(f, "warn"),
            DevLogLevel::Info => write!(f, "info"),
            DevLogLevel::Log => write!(f, "log"),
            DevLogLevel::Debug => write!(f, "debug"),
        }
    }
}

/// Development-server sub-options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DevOptions {
    pub log_level: DevLogLevel,
}

impl Default for DevOptions {
    fn default() -> Self {
        Self {
            log_level: DevLogLevel::None,
        }
    }
}

/// Everything the runtime needs to start one worker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerStartOptions {
    /// Script or config source
    pub source: WorkerSource,
    /// Dev server options
    pub dev: DevOptions,
    /// Directory relative paths are resolved against
    pub working_dir: PathBuf,
}

/// Picks the start strategy for a worker
#[derive(Debug, Clone)]
pub struct ConfigResolver {
    working_dir: PathBuf,
    entry_support: bool,
}

impl ConfigResolver {
    /// Create a resolver probing the given directory
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
            entry_support: true,
        }
    }

    /// Create a resolver for the process working directory
    pub fn from_current_dir() -> WfetchResult<Self> {
        Ok(Self::new(std::env::current_dir()?))
    }

    /// Enable or disable starting from an entry script
    pub fn with_entry_support(mut self, enabled: bool) -> Self {
        self.entry_support = enabled;
        self
    }

    /// Decide how to start the runtime. First match wins:
    /// entry script, explicit config, first existing candidate, default name.
    pub fn resolve(&self, options: &FetchOptions) -> WorkerStartOptions {
        let source = self.resolve_source(options);
        debug!(source = ?source, "Resolved worker source");

        WorkerStartOptions {
            source,
            dev: DevOptions::default(),
            working_dir: self.working_dir.clone(),
        }
    }

    fn resolve_source(&self, options: &FetchOptions) -> WorkerSource {
        if self.entry_support {
            if let Some(entry) = options.entry.as_deref().filter(|e| !e.is_empty()) {
                return WorkerSource::Script(PathBuf::from(entry));
            }
        }

        if let Some(config) = options.config.as_deref().filter(|c| !c.is_empty()) {
            return WorkerSource::Config(PathBuf::from(config));
        }

        let detected = CONFIG_CANDIDATES
            .iter()
            .find(|name| self.working_dir.join(name).exists())
            .copied()
            .unwrap_or(DEFAULT_CONFIG);

        WorkerSource::Config(PathBuf::from(detected))
    }

    /// Fail fast when the resolved source names a config file that is missing.
    pub fn validate(&self, start: &WorkerStartOptions) -> WfetchResult<()> {
        match start.source.config_path() {
            Some(path) if !self.working_dir.join(path).exists() => {
                Err(WfetchError::ConfigNotFound(path.to_path_buf()))
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn resolver() -> (tempfile::TempDir, ConfigResolver) {
        let dir = tempfile::tempdir().unwrap();
        let resolver = ConfigResolver::new(dir.path());
        (dir, resolver)
    }

    #[test]
    fn test_explicit_config() {
        let (_dir, resolver) = resolver();
        let options = FetchOptions {
            config: Some("wrangler.toml".to_string()),
            ..FetchOptions::default()
        };
        let start = resolver.resolve(&options);
        assert_eq!(start.source, WorkerSource::Config(PathBuf::from("wrangler.toml")));
        assert_eq!(start.dev.log_level, DevLogLevel::None);
    }

    #[test]
    fn test_default_config_when_nothing_present() {
        let (_dir, resolver) = resolver();
        let start = resolver.resolve(&FetchOptions::default());
        assert_eq!(start.source, WorkerSource::Config(PathBuf::from("wrangler.json")));

        let err = resolver.validate(&start).unwrap_err();
        match err {
            WfetchError::ConfigNotFound(path) => assert_eq!(path, PathBuf::from("wrangler.json")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_detects_toml() {
        let (dir, resolver) = resolver();
        fs::write(dir.path().join("wrangler.toml"), "name = \"demo\"").unwrap();

        let start = resolver.resolve(&FetchOptions::default());
        assert_eq!(start.source, WorkerSource::Config(PathBuf::from("wrangler.toml")));
        assert!(resolver.validate(&start).is_ok());
    }

    #[test]
    fn test_candidate_order() {
        let (dir, resolver) = resolver();
        fs::write(dir.path().join("wrangler.toml"), "").unwrap();
        fs::write(dir.path().join("wrangler.jsonc"), "{}").unwrap();

        let start = resolver.resolve(&FetchOptions::default());
        assert_eq!(start.source, WorkerSource::Config(PathBuf::from("wrangler.jsonc")));

        fs::write(dir.path().join("wrangler.json"), "{}").unwrap();
        let start = resolver.resolve(&FetchOptions::default());
        assert_eq!(start.source, WorkerSource::Config(PathBuf::from("wrangler.json")));
    }

    #[test]
    fn test_entry_takes_precedence() {
        let (_dir, resolver) = resolver();
        let options = FetchOptions {
            config: Some("wrangler.toml".to_string()),
            entry: Some("src/index.ts".to_string()),
            ..FetchOptions::default()
        };
        let start = resolver.resolve(&options);
        assert_eq!(start.source, WorkerSource::Script(PathBuf::from("src/index.ts")));
        // Scripts are not checked for existence.
        assert!(resolver.validate(&start).is_ok());
    }

    #[test]
    fn test_entry_ignored_when_disabled() {
        let (_dir, resolver) = resolver();
        let resolver = resolver.with_entry_support(false);
        let options = FetchOptions {
            config: Some("custom.json".to_string()),
            entry: Some("src/index.ts".to_string()),
            ..FetchOptions::default()
        };
        let start = resolver.resolve(&options);
        assert_eq!(start.source, WorkerSource::Config(PathBuf::from("custom.json")));
    }

    #[test]
    fn test_explicit_missing_config() {
        let (_dir, resolver) = resolver();
        let options = FetchOptions {
            config: Some("missing.json".to_string()),
            ..FetchOptions::default()
        };
        let start = resolver.resolve(&options);
        let err = resolver.validate(&start).unwrap_err();
        assert!(err.to_string().contains("missing.json"));
    }
}
