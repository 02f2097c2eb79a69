//! Verifier configuration.
//!
//! A [`Config`] names the directory holding verifier executables, how many of
//! them may run, and how long each one may take. It can be built in code or
//! loaded from YAML:
//!
//! ```yaml
//! bin_dir: /opt/imgverify/bin
//! max_verifiers: 10
//! per_verifier_timeout_ms: 10000
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default directory scanned for verifier executables.
pub const DEFAULT_BIN_DIR: &str = "/opt/imgverify/bin";

/// Default number of verifiers consulted per image.
pub const DEFAULT_MAX_VERIFIERS: i32 = 10;

/// Default time budget of a single verifier.
pub const DEFAULT_PER_VERIFIER_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration of a [`BinDirVerifier`](crate::BinDirVerifier).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory containing verifier executables
    pub bin_dir: PathBuf,
    /// Verifier cap: negative runs every verifier, zero disables
    /// verification, N runs the first N in name order
    pub max_verifiers: i32,
    /// Time budget of each verifier, from spawn to exit
    #[serde(rename = "per_verifier_timeout_ms", with = "duration_millis")]
    pub per_verifier_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bin_dir: PathBuf::from(DEFAULT_BIN_DIR),
            max_verifiers: DEFAULT_MAX_VERIFIERS,
            per_verifier_timeout: DEFAULT_PER_VERIFIER_TIMEOUT,
        }
    }
}

impl Config {
    /// Creates a configuration for `bin_dir` with default limits.
    pub fn new(bin_dir: impl Into<PathBuf>) -> Self {
        Self {
            bin_dir: bin_dir.into(),
            ..Self::default()
        }
    }

    /// Sets the verifier cap.
    pub fn with_max_verifiers(mut self, max_verifiers: i32) -> Self {
        self.max_verifiers = max_verifiers;
        self
    }

    /// Sets the per-verifier time budget.
    pub fn with_per_verifier_timeout(mut self, timeout: Duration) -> Self {
        self.per_verifier_timeout = timeout;
        self
    }

    /// Parses and validates a YAML document.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Checks that the configuration can drive a verification.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bin_dir.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("bin_dir must not be empty".to_string()));
        }
        if self.per_verifier_timeout.is_zero() {
            return Err(ConfigError::Invalid(
                "per_verifier_timeout_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

mod duration_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (duration.as_millis() as u64).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
