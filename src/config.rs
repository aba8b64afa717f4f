//! Configuration types for m3u-sweep

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default User-Agent, shaped like a media player so IPTV hosts answer the
/// same way they would for a real client.
pub const DEFAULT_USER_AGENT: &str = "VLC/3.0.20 LibVLC/3.0.20";

/// Probe behavior configuration (concurrency, timeout, classification)
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProbeConfig {
    /// Maximum number of probes in flight at once (default: 50)
    #[serde(default = "default_concurrency_limit")]
    pub concurrency_limit: usize,

    /// Per-request timeout, in seconds (default: 5, fractional values allowed)
    #[serde(default = "default_timeout", with = "duration_serde")]
    pub timeout: Duration,

    /// User-Agent header sent with every probe
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Treat 5xx responses as working (default: false)
    ///
    /// Some stream servers answer HEAD with 5xx while still serving GET.
    #[serde(default)]
    pub keep_server_errors: bool,

    /// Maximum redirect hops followed before a probe fails (default: 10)
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            concurrency_limit: default_concurrency_limit(),
            timeout: default_timeout(),
            user_agent: default_user_agent(),
            keep_server_errors: false,
            max_redirects: default_max_redirects(),
        }
    }
}

/// How URLs are compared when detecting duplicates
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateMatch {
    /// Byte-for-byte comparison
    #[default]
    Exact,
    /// Comparison after lowercasing both URLs
    CaseInsensitive,
}

impl DuplicateMatch {
    /// Key under which a URL is recorded in the seen-set
    pub fn key(self, url: &str) -> String {
        match self {
            DuplicateMatch::Exact => url.to_string(),
            DuplicateMatch::CaseInsensitive => url.to_lowercase(),
        }
    }
}

/// Main configuration for a validation run
///
/// The probe settings are flattened, so the JSON format is a single flat
/// object:
///
/// ```json
/// {
///   "input_path": "channels.m3u",
///   "concurrency_limit": 20,
///   "timeout": 2.5,
///   "keep_server_errors": true
/// }
/// ```
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Playlist to validate
    #[serde(default)]
    pub input_path: PathBuf,

    /// Where to write the cleaned playlist (None = overwrite the input)
    #[serde(default)]
    pub output_path: Option<PathBuf>,

    /// Probe settings
    #[serde(flatten)]
    pub probe: ProbeConfig,

    /// Duplicate comparison mode
    #[serde(default)]
    pub duplicate_match: DuplicateMatch,

    /// Probe and report, but leave the filesystem untouched
    #[serde(default)]
    pub dry_run: bool,
}

impl Config {
    /// Create a configuration for `input_path` with every other setting at its default
    pub fn new(input_path: impl Into<PathBuf>) -> Self {
        Self {
            input_path: input_path.into(),
            ..Default::default()
        }
    }

    /// Load a configuration from a JSON file
    ///
    /// A missing or unreadable file is [`Error::Io`]; malformed content is
    /// [`Error::Config`].
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        serde_json::from_str(&raw).map_err(|e| Error::Config {
            message: format!("{}: {}", path.display(), e),
            key: None,
        })
    }

    /// Destination of the cleaned playlist: the explicit target, else the input path
    pub fn resolved_output_path(&self) -> &Path {
        self.output_path.as_deref().unwrap_or(&self.input_path)
    }

    /// Reject settings the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.input_path.as_os_str().is_empty() {
            return Err(Error::config("input_path", "input path is required"));
        }
        if self.probe.concurrency_limit == 0 {
            return Err(Error::config(
                "concurrency_limit",
                "concurrency limit must be at least 1",
            ));
        }
        if self.probe.timeout.is_zero() {
            return Err(Error::config(
                "timeout",
                "timeout must be greater than zero",
            ));
        }
        if self.probe.user_agent.trim().is_empty() {
            return Err(Error::config("user_agent", "user agent must not be empty"));
        }
        Ok(())
    }
}

fn default_concurrency_limit() -> usize {
    50
}

fn default_timeout() -> Duration {
    Duration::from_secs(5)
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_max_redirects() -> usize {
    10
}

// Duration serialization helper (seconds, fractional allowed)
pub(crate) mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer, de::Error as _};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_f64(duration.as_secs_f64())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(D::Error::custom)
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::new("list.m3u");
        assert_eq!(config.probe.concurrency_limit, 50);
        assert_eq!(config.probe.timeout, Duration::from_secs(5));
        assert_eq!(config.probe.user_agent, DEFAULT_USER_AGENT);
        assert!(!config.probe.keep_server_errors);
        assert_eq!(config.probe.max_redirects, 10);
        assert_eq!(config.duplicate_match, DuplicateMatch::Exact);
        assert!(!config.dry_run);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn output_path_defaults_to_input_path() {
        let mut config = Config::new("in.m3u");
        assert_eq!(config.resolved_output_path(), Path::new("in.m3u"));

        config.output_path = Some("out.m3u".into());
        assert_eq!(config.resolved_output_path(), Path::new("out.m3u"));
    }

    #[test]
    fn validate_rejects_zero_concurrency() {
        let mut config = Config::new("in.m3u");
        config.probe.concurrency_limit = 0;
        match config.validate() {
            Err(Error::Config { key, .. }) => assert_eq!(key.as_deref(), Some("concurrency_limit")),
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[test]
    fn validate_rejects_zero_timeout_and_missing_input() {
        let mut config = Config::new("in.m3u");
        config.probe.timeout = Duration::ZERO;
        assert!(matches!(config.validate(), Err(Error::Config { .. })));

        let config = Config::default();
        match config.validate() {
            Err(Error::Config { key, .. }) => assert_eq!(key.as_deref(), Some("input_path")),
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[test]
    fn duplicate_match_keys() {
        let url = "http://Example.COM/Live";
        assert_eq!(DuplicateMatch::Exact.key(url), url);
        assert_eq!(
            DuplicateMatch::CaseInsensitive.key(url),
            "http://example.com/live"
        );
    }

    #[test]
    fn flat_json_deserializes_with_defaults_for_missing_fields() {
        let json = r#"{
            "input_path": "channels.m3u",
            "concurrency_limit": 8,
            "timeout": 2.5,
            "duplicate_match": "case_insensitive"
        }"#;
        let config: Config = serde_json::from_str(json).unwrap();

        assert_eq!(config.input_path, PathBuf::from("channels.m3u"));
        assert_eq!(config.probe.concurrency_limit, 8);
        assert_eq!(config.probe.timeout, Duration::from_millis(2500));
        assert_eq!(config.probe.user_agent, DEFAULT_USER_AGENT);
        assert_eq!(config.duplicate_match, DuplicateMatch::CaseInsensitive);
        assert!(config.output_path.is_none());
    }

    #[test]
    fn negative_timeout_is_rejected_by_deserializer() {
        let json = r#"{ "input_path": "a.m3u", "timeout": -1 }"#;
        assert!(serde_json::from_str::<Config>(json).is_err());
    }

    #[test]
    fn config_default_survives_json_round_trip() {
        let mut original = Config::new("a.m3u");
        original.probe.timeout = Duration::from_millis(750);
        original.probe.keep_server_errors = true;

        let json = serde_json::to_string(&original).unwrap();
        let restored: Config = serde_json::from_str(&json).unwrap();

        assert_eq!(restored.probe.timeout, original.probe.timeout);
        assert!(restored.probe.keep_server_errors);
        assert_eq!(restored.input_path, original.input_path);
    }

    #[test]
    fn from_json_file_reads_config() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sweep.json");
        std::fs::write(&path, r#"{ "input_path": "x.m3u", "dry_run": true }"#).unwrap();

        let config = Config::from_json_file(&path).unwrap();
        assert!(config.dry_run);
        assert_eq!(config.input_path, PathBuf::from("x.m3u"));
    }

    #[test]
    fn from_json_file_missing_is_io_error() {
        let dir = TempDir::new().unwrap();
        let err = Config::from_json_file(&dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn from_json_file_malformed_is_config_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, r#"{ "timeout": "soon" }"#).unwrap();

        let err = Config::from_json_file(&path).unwrap_err();
        assert!(matches!(err, Error::Config { key: None, .. }));
    }
}
