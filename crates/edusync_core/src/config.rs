//! Engine configuration.
//!
//! # Responsibility
//! - Describe cache location, remote authority endpoint and per-kind
//!   autosave policy.
//! - Load and validate configuration from a JSON file.
//!
//! # Invariants
//! - Every field has a default, so `{}` is a valid configuration.
//! - Validated configurations have non-zero quiet periods and timeouts.

use crate::model::aggregate::AggregateKind;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "http://localhost:8080/api";
const DEFAULT_TIMEOUT_MS: u64 = 10_000;
const PROFILE_QUIET_PERIOD_MS: u64 = 1_000;
const QUESTION_QUIET_PERIOD_MS: u64 = 5_000;

/// Configuration load/validation failure.
#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: std::io::Error },
    Parse(serde_json::Error),
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "invalid config json: {err}"),
            Self::Invalid(message) => write!(f, "invalid config: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            Self::Invalid(_) => None,
        }
    }
}

/// Where an automatic (debounced) flush writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutosaveTarget {
    /// Local cache only; remote writes wait for an explicit save.
    LocalOnly,
    /// Local cache, then the remote authority.
    LocalAndRemote,
}

/// Debounce policy of one aggregate kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindPolicy {
    pub quiet_period_ms: u64,
    pub autosave: AutosaveTarget,
}

impl KindPolicy {
    pub fn quiet_period(&self) -> Duration {
        Duration::from_millis(self.quiet_period_ms)
    }

    pub fn autosaves_remotely(&self) -> bool {
        self.autosave == AutosaveTarget::LocalAndRemote
    }
}

/// Per-kind policies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KindPolicies {
    pub profile: KindPolicy,
    pub memo: KindPolicy,
    pub question: KindPolicy,
    pub exam: KindPolicy,
}

impl Default for KindPolicies {
    fn default() -> Self {
        let profile_like = KindPolicy {
            quiet_period_ms: PROFILE_QUIET_PERIOD_MS,
            autosave: AutosaveTarget::LocalAndRemote,
        };
        let question_like = KindPolicy {
            quiet_period_ms: QUESTION_QUIET_PERIOD_MS,
            autosave: AutosaveTarget::LocalOnly,
        };
        Self {
            profile: profile_like,
            memo: profile_like,
            question: question_like,
            exam: question_like,
        }
    }
}

impl KindPolicies {
    pub fn for_kind(&self, kind: AggregateKind) -> KindPolicy {
        match kind {
            AggregateKind::Profile => self.profile,
            AggregateKind::Memo => self.memo,
            AggregateKind::Question => self.question,
            AggregateKind::Exam => self.exam,
        }
    }
}

/// Remote authority endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    pub base_url: String,
    pub timeout_ms: u64,
    /// Bearer token issued by the authentication layer.
    pub auth_token: Option<String>,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            auth_token: None,
        }
    }
}

impl RemoteConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// SQLite cache file; `None` keeps the cache in memory.
    pub cache_path: Option<PathBuf>,
    /// Byte quota for cached payloads; `None` is unlimited.
    pub cache_quota_bytes: Option<usize>,
    pub remote: RemoteConfig,
    pub kinds: KindPolicies,
    /// Log level for `init_logging`; defaults by build mode when absent.
    pub log_level: Option<String>,
}

impl EngineConfig {
    /// Reads and validates a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for kind in AggregateKind::ALL {
            if self.kinds.for_kind(kind).quiet_period_ms == 0 {
                return Err(ConfigError::Invalid(format!(
                    "quiet period for `{kind}` must be greater than zero"
                )));
            }
        }
        if self.remote.timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "remote timeout must be greater than zero".to_string(),
            ));
        }
        let base_url = self.remote.base_url.trim();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ConfigError::Invalid(format!(
                "remote base url must be http(s), got `{base_url}`"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{AutosaveTarget, ConfigError, EngineConfig};
    use crate::model::aggregate::AggregateKind;
    use std::time::Duration;

    #[test]
    fn empty_object_yields_defaults() {
        let config = EngineConfig::from_json_str("{}").unwrap();
        assert_eq!(config, EngineConfig::default());

        let profile = config.kinds.for_kind(AggregateKind::Profile);
        assert_eq!(profile.quiet_period(), Duration::from_secs(1));
        assert!(profile.autosaves_remotely());

        let question = config.kinds.for_kind(AggregateKind::Question);
        assert_eq!(question.quiet_period(), Duration::from_secs(5));
        assert_eq!(question.autosave, AutosaveTarget::LocalOnly);
    }

    #[test]
    fn partial_override_keeps_other_defaults() {
        let config = EngineConfig::from_json_str(
            r#"{ "kinds": { "memo": { "quiet_period_ms": 250, "autosave": "local_only" } },
                 "remote": { "base_url": "https://lms.example.edu/api" } }"#,
        )
        .unwrap();
        assert_eq!(config.kinds.memo.quiet_period_ms, 250);
        assert_eq!(config.kinds.profile.quiet_period_ms, 1_000);
        assert_eq!(config.remote.timeout_ms, 10_000);
    }

    #[test]
    fn rejects_zero_quiet_period_and_non_http_url() {
        let err = EngineConfig::from_json_str(
            r#"{ "kinds": { "exam": { "quiet_period_ms": 0, "autosave": "local_only" } } }"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(message) if message.contains("exam")));

        let err =
            EngineConfig::from_json_str(r#"{ "remote": { "base_url": "ftp://host" } }"#)
                .unwrap_err();
        assert!(err.to_string().contains("http(s)"));
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = EngineConfig::load(dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
