//! Configuration model for the e2e harness.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants;
use crate::error::{CrivetError, Result};

/// Defaults applied by the request builders, the lifecycle driver and the
/// status poller.
///
/// Every field is optional in the JSON form; missing fields take the value
/// from [`crate::constants`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Owner UID written into sandbox metadata.
    pub uid: String,
    /// Namespace written into sandbox metadata.
    pub namespace: String,
    /// Attempt count written into sandbox and container metadata.
    pub attempt: u32,
    /// Image reference used for every test container.
    pub image: String,
    /// Grace period for stop requests when the caller supplies none.
    pub stop_timeout_secs: i64,
    /// Text echoed by log containers and expected back in their log file.
    pub log_message: String,
    /// Directory under which per-sandbox log directories are created.
    pub log_root: PathBuf,
    /// Interval between status queries while waiting for a state.
    pub poll_interval_ms: u64,
    /// Upper bound on a single wait for a container state.
    pub poll_timeout_ms: u64,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            uid: constants::DEFAULT_UID.to_string(),
            namespace: constants::DEFAULT_NAMESPACE.to_string(),
            attempt: constants::DEFAULT_ATTEMPT,
            image: constants::DEFAULT_CONTAINER_IMAGE.to_string(),
            stop_timeout_secs: constants::DEFAULT_STOP_CONTAINER_TIMEOUT,
            log_message: constants::DEFAULT_LOG.to_string(),
            log_root: PathBuf::from(constants::DEFAULT_LOG_ROOT),
            poll_interval_ms: constants::DEFAULT_POLL_INTERVAL_MS,
            poll_timeout_ms: constants::DEFAULT_POLL_TIMEOUT_MS,
        }
    }
}

impl HarnessConfig {
    /// Loads a configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid JSON, or
    /// fails [`HarnessConfig::validate`].
    pub fn from_file(path: &Path) -> Result<Self> {
        tracing::debug!(path = %path.display(), "loading harness configuration");
        let content = std::fs::read_to_string(path).map_err(|e| CrivetError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks value ranges that serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`CrivetError::Config`] for a negative stop timeout, a zero
    /// poll interval, or an empty image reference.
    pub fn validate(&self) -> Result<()> {
        if self.stop_timeout_secs < 0 {
            return Err(CrivetError::Config {
                message: format!(
                    "stop_timeout_secs must be non-negative, got {}",
                    self.stop_timeout_secs
                ),
            });
        }
        if self.poll_interval_ms == 0 {
            return Err(CrivetError::Config {
                message: "poll_interval_ms must be greater than zero".to_string(),
            });
        }
        if self.image.trim().is_empty() {
            return Err(CrivetError::Config {
                message: "image must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Interval between status queries.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Upper bound on a single status wait.
    #[must_use]
    pub const fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms)
    }
}
