//! Configuration module for zonesync.
//!
//! Provides typed configuration structs that map to the YAML configuration file,
//! with loading, validation, defaults, and a builder pattern for programmatic use.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::{DomainError, Scope, ScopeKind, SubscriptionId, SyncTarget};

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for zonesync.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub sync: SyncConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

/// Synchronization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Scopes to synchronize, each with the subscription that watches it.
    pub targets: Vec<TargetConfig>,
    /// Namespace prefix for every key the token store writes.
    pub token_key_prefix: String,
    /// Upper bound on fetch requests per stage when the service keeps
    /// reporting `more_coming`.
    pub max_fetch_rounds: u32,
    /// Remember registered subscriptions locally and skip re-registering.
    pub cache_subscriptions: bool,
    /// Seconds between scheduled polls when no notification arrives.
    pub poll_interval: u64,
}

/// One synchronization target as written in the YAML file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetConfig {
    pub scope: ScopeKind,
    pub subscription_id: String,
}

impl TargetConfig {
    /// Convert into a validated [`SyncTarget`].
    pub fn to_target(&self) -> Result<SyncTarget, DomainError> {
        let id = SubscriptionId::new(self.subscription_id.clone())?;
        Ok(SyncTarget::new(Scope::new(self.scope), id))
    }
}

/// Local persistence settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite database holding change tokens and recorded sync events.
    pub database: PathBuf,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
}

// ---------------------------------------------------------------------------
// Config::load()
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/zonesync/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("zonesync")
            .join("config.yaml")
    }

    /// Convert every configured target, failing on the first invalid one.
    pub fn targets(&self) -> Result<Vec<SyncTarget>, DomainError> {
        self.sync.targets.iter().map(TargetConfig::to_target).collect()
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

/// Default namespace for token keys.
pub const DEFAULT_TOKEN_KEY_PREFIX: &str = "zonesync.change-token";

/// Default subscription watching the private scope.
pub const DEFAULT_SUBSCRIPTION_ID: &str = "private-changes";

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            targets: vec![TargetConfig {
                scope: ScopeKind::Private,
                subscription_id: DEFAULT_SUBSCRIPTION_ID.to_string(),
            }],
            token_key_prefix: DEFAULT_TOKEN_KEY_PREFIX.to_string(),
            max_fetch_rounds: 16,
            cache_subscriptions: true,
            poll_interval: 300,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database: dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("~/.local/share"))
                .join("zonesync")
                .join("state.db"),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config::validate()
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"sync.max_fetch_rounds"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level`.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        // --- sync ---
        if self.sync.targets.is_empty() {
            errors.push(ValidationError {
                field: "sync.targets".into(),
                message: "at least one target is required".into(),
            });
        }
        let mut seen = HashSet::new();
        for (i, target) in self.sync.targets.iter().enumerate() {
            if let Err(e) = SubscriptionId::new(target.subscription_id.clone()) {
                errors.push(ValidationError {
                    field: format!("sync.targets[{i}].subscription_id"),
                    message: e.to_string(),
                });
            }
            if !seen.insert(target.scope) {
                errors.push(ValidationError {
                    field: format!("sync.targets[{i}].scope"),
                    message: format!("scope '{}' is listed more than once", target.scope),
                });
            }
        }
        if self.sync.token_key_prefix.trim().is_empty() {
            errors.push(ValidationError {
                field: "sync.token_key_prefix".into(),
                message: "must not be empty".into(),
            });
        }
        if self.sync.max_fetch_rounds == 0 {
            errors.push(ValidationError {
                field: "sync.max_fetch_rounds".into(),
                message: "must be greater than 0".into(),
            });
        }
        if self.sync.poll_interval == 0 {
            errors.push(ValidationError {
                field: "sync.poll_interval".into(),
                message: "must be greater than 0".into(),
            });
        }

        // --- storage ---
        if self.storage.database.as_os_str().is_empty() {
            errors.push(ValidationError {
                field: "storage.database".into(),
                message: "must not be empty".into(),
            });
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError {
                field: "logging.level".into(),
                message: format!(
                    "invalid level '{}'; valid options: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            });
        }

        errors
    }
}

// ---------------------------------------------------------------------------
// ConfigBuilder
// ---------------------------------------------------------------------------

/// Builder for constructing a [`Config`] programmatically.
///
/// Starts from [`Config::default`] and allows selective overrides.
///
/// # Example
///
/// ```rust,no_run
/// use zonesync_core::config::ConfigBuilder;
/// use zonesync_core::domain::ScopeKind;
///
/// let config = ConfigBuilder::new()
///     .target(ScopeKind::Shared, "shared-changes")
///     .max_fetch_rounds(4)
///     .logging_level("debug")
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder initialised with [`Config::default`] values.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    // --- sync ---

    /// Add a target; the default private target is kept.
    pub fn target(mut self, scope: ScopeKind, subscription_id: impl Into<String>) -> Self {
        self.config.sync.targets.push(TargetConfig {
            scope,
            subscription_id: subscription_id.into(),
        });
        self
    }

    /// Replace every configured target.
    pub fn targets(mut self, targets: Vec<TargetConfig>) -> Self {
        self.config.sync.targets = targets;
        self
    }

    pub fn token_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.sync.token_key_prefix = prefix.into();
        self
    }

    pub fn max_fetch_rounds(mut self, rounds: u32) -> Self {
        self.config.sync.max_fetch_rounds = rounds;
        self
    }

    pub fn cache_subscriptions(mut self, enabled: bool) -> Self {
        self.config.sync.cache_subscriptions = enabled;
        self
    }

    pub fn poll_interval(mut self, seconds: u64) -> Self {
        self.config.sync.poll_interval = seconds;
        self
    }

    // --- storage ---

    pub fn database(mut self, path: PathBuf) -> Self {
        self.config.storage.database = path;
        self
    }

    // --- logging ---

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    // --- build ---

    /// Consume the builder and return the finished [`Config`].
    pub fn build(self) -> Config {
        self.config
    }

    /// Build and validate in one step. Returns `Err` with the list of
    /// validation errors if the configuration is invalid.
    pub fn build_validated(self) -> Result<Config, Vec<ValidationError>> {
        let config = self.build();
        let errors = config.validate();
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(errors)
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    // -- Defaults --

    #[test]
    fn default_config_has_sensible_values() {
        let cfg = Config::default();
        assert_eq!(cfg.sync.targets.len(), 1);
        assert_eq!(cfg.sync.targets[0].scope, ScopeKind::Private);
        assert_eq!(cfg.sync.targets[0].subscription_id, "private-changes");
        assert_eq!(cfg.sync.token_key_prefix, "zonesync.change-token");
        assert_eq!(cfg.sync.max_fetch_rounds, 16);
        assert!(cfg.sync.cache_subscriptions);
        assert_eq!(cfg.sync.poll_interval, 300);
        assert!(cfg.storage.database.ends_with("zonesync/state.db"));
        assert_eq!(cfg.logging.level, "info");
    }

    #[test]
    fn default_config_passes_validation() {
        let errors = Config::default().validate();
        assert!(errors.is_empty(), "unexpected validation errors: {errors:?}");
    }

    // -- Loading --

    #[test]
    fn load_from_yaml_file() {
        let yaml = r#"
sync:
  targets:
    - scope: private
      subscription_id: private-changes
    - scope: shared
      subscription_id: shared-changes
  token_key_prefix: test.tokens
  max_fetch_rounds: 3
  cache_subscriptions: false
  poll_interval: 60
storage:
  database: /tmp/zonesync-test.db
logging:
  level: debug
"#;
        let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
        tmp.write_all(yaml.as_bytes()).unwrap();
        tmp.flush().unwrap();

        let cfg = Config::load(tmp.path()).expect("load config");
        assert_eq!(cfg.sync.targets.len(), 2);
        assert_eq!(cfg.sync.targets[1].scope, ScopeKind::Shared);
        assert_eq!(cfg.sync.token_key_prefix, "test.tokens");
        assert_eq!(cfg.sync.max_fetch_rounds, 3);
        assert!(!cfg.sync.cache_subscriptions);
        assert_eq!(cfg.sync.poll_interval, 60);
        assert_eq!(cfg.storage.database, PathBuf::from("/tmp/zonesync-test.db"));
        assert_eq!(cfg.logging.level, "debug");

        let targets = cfg.targets().unwrap();
        assert_eq!(targets[1].subscription_id.as_str(), "shared-changes");
    }

    #[test]
    fn load_partial_yaml_fills_defaults() {
        let yaml = "logging:\n  level: warn\n";
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(yaml.as_bytes()).unwrap();
        tmp.flush().unwrap();

        let cfg = Config::load(tmp.path()).unwrap();
        assert_eq!(cfg.logging.level, "warn");
        assert_eq!(cfg.sync.max_fetch_rounds, 16);
        assert_eq!(cfg.sync.targets.len(), 1);
    }

    #[test]
    fn load_or_default_returns_default_on_missing_file() {
        let cfg = Config::load_or_default(Path::new("/nonexistent/config.yaml"));
        assert_eq!(cfg.sync.poll_interval, 300);
    }

    #[test]
    fn load_rejects_unknown_scope() {
        let yaml = "sync:\n  targets:\n    - scope: team\n      subscription_id: x\n";
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(yaml.as_bytes()).unwrap();
        tmp.flush().unwrap();

        assert!(Config::load(tmp.path()).is_err());
    }

    // -- Validation --

    #[test]
    fn validate_reports_every_problem() {
        let cfg = ConfigBuilder::new()
            .targets(vec![
                TargetConfig {
                    scope: ScopeKind::Private,
                    subscription_id: String::new(),
                },
                TargetConfig {
                    scope: ScopeKind::Private,
                    subscription_id: "again".into(),
                },
            ])
            .token_key_prefix("  ")
            .max_fetch_rounds(0)
            .poll_interval(0)
            .logging_level("loud")
            .build();

        let fields: Vec<_> = cfg.validate().into_iter().map(|e| e.field).collect();
        assert!(fields.contains(&"sync.targets[0].subscription_id".to_string()));
        assert!(fields.contains(&"sync.targets[1].scope".to_string()));
        assert!(fields.contains(&"sync.token_key_prefix".to_string()));
        assert!(fields.contains(&"sync.max_fetch_rounds".to_string()));
        assert!(fields.contains(&"sync.poll_interval".to_string()));
        assert!(fields.contains(&"logging.level".to_string()));
    }

    #[test]
    fn validate_requires_a_target() {
        let cfg = ConfigBuilder::new().targets(Vec::new()).build();
        let errors = cfg.validate();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "sync.targets");
    }

    // -- Builder --

    #[test]
    fn builder_build_validated_ok() {
        let cfg = ConfigBuilder::new()
            .target(ScopeKind::Shared, "shared-changes")
            .cache_subscriptions(false)
            .database(PathBuf::from("/tmp/state.db"))
            .build_validated()
            .expect("valid config");
        assert_eq!(cfg.sync.targets.len(), 2);
        assert!(!cfg.sync.cache_subscriptions);
    }

    #[test]
    fn builder_build_validated_err() {
        let result = ConfigBuilder::new().max_fetch_rounds(0).build_validated();
        let errors = result.unwrap_err();
        assert_eq!(errors[0].field, "sync.max_fetch_rounds");
    }

    #[test]
    fn validation_error_display() {
        let err = ValidationError {
            field: "sync.poll_interval".into(),
            message: "must be greater than 0".into(),
        };
        assert_eq!(err.to_string(), "sync.poll_interval: must be greater than 0");
    }
}
