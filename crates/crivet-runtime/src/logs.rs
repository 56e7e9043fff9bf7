//! Container log file placement and capture.

use std::io::Write;
use std::path::{Path, PathBuf};

use crivet_common::error::{CrivetError, Result};
use crivet_common::jsonlog::LogRecord;

use crate::service::{ContainerConfig, PodSandboxConfig};

/// Joins a container's log path onto its sandbox's log directory.
///
/// An absolute `log_path` replaces `log_directory`.
#[must_use]
pub fn log_file_path(log_directory: &Path, log_path: &Path) -> PathBuf {
    log_directory.join(log_path)
}

/// Returns where the runtime captures a container's output, if the sandbox
/// and the container both opted into logging.
#[must_use]
pub fn container_log_file(
    sandbox: &PodSandboxConfig,
    container: &ContainerConfig,
) -> Option<PathBuf> {
    let dir = sandbox.log_directory.as_deref()?;
    let path = container.log_path.as_deref()?;
    Some(log_file_path(dir, path))
}

/// Appends one JSON log line to `path`.
///
/// Creates the parent directory and file if they do not exist.
///
/// # Errors
///
/// Returns an error if the directory or file cannot be created or written.
pub fn append_record(path: &Path, record: &LogRecord) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| CrivetError::Io {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }
    let line = record.to_json_line()?;
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| CrivetError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
    writeln!(file, "{line}").map_err(|e| CrivetError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    tracing::debug!(path = %path.display(), stream = %record.stream, "captured log line");
    Ok(())
}
