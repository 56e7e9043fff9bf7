//! Verification of captured container logs.
//!
//! A log file holds one JSON record per line. [`LogFile::records`] decodes
//! them lazily; [`LogVerifier`] compares them with an [`ExpectedLog`].
//! Timestamps are decoded but never compared since the producer's clock is
//! not under test control.

use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};

use crivet_common::jsonlog::{LogRecord, StreamTag};
use crivet_runtime::logs::log_file_path;

use crate::driver::{SandboxHandle, TrackedContainer};
use crate::error::{Result, VerifyError};

/// Output a container is expected to have written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpectedLog {
    /// Expected stream.
    pub stream: StreamTag,
    /// Expected line content, without terminator.
    pub payload: Vec<u8>,
}

impl ExpectedLog {
    /// Expects `payload` on stdout.
    #[must_use]
    pub fn stdout(payload: impl Into<Vec<u8>>) -> Self {
        Self {
            stream: StreamTag::Stdout,
            payload: payload.into(),
        }
    }

    /// Expects `payload` on stderr.
    #[must_use]
    pub fn stderr(payload: impl Into<Vec<u8>>) -> Self {
        Self {
            stream: StreamTag::Stderr,
            payload: payload.into(),
        }
    }

    /// Returns whether `record` has the expected payload and stream.
    #[must_use]
    pub fn matches(&self, record: &LogRecord) -> bool {
        record.payload == self.payload && record.stream == self.stream
    }

    /// Compares payload, then stream, of a record read from `path`.
    ///
    /// # Errors
    ///
    /// Returns [`VerifyError::ContentMismatch`] naming the log file and the
    /// first differing field.
    pub fn check(&self, path: &Path, record: &LogRecord) -> Result<()> {
        let mismatch = |field, expected, actual| VerifyError::ContentMismatch {
            path: path.to_path_buf(),
            field,
            expected,
            actual,
        };
        if record.payload != self.payload {
            let expected = String::from_utf8_lossy(&self.payload).into_owned();
            return Err(mismatch("payload", expected, record.payload_lossy()));
        }
        if record.stream != self.stream {
            let expected = self.stream.to_string();
            return Err(mismatch("stream", expected, record.stream.to_string()));
        }
        Ok(())
    }
}

impl fmt::Display for ExpectedLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?} on {}",
            String::from_utf8_lossy(&self.payload),
            self.stream
        )
    }
}

/// Which records of a multi-line log have to match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchPolicy {
    /// The first record must match; later lines are not decoded.
    #[default]
    First,
    /// At least one record must match.
    Any,
    /// Every record must match.
    All,
}

/// Full content of a log file, read once.
#[derive(Debug, Clone)]
pub struct LogFile {
    path: PathBuf,
    content: Vec<u8>,
}

impl LogFile {
    /// Reads the whole file at `path`.
    ///
    /// The producer is assumed to have exited or flushed; the file is not
    /// tailed.
    ///
    /// # Errors
    ///
    /// Returns [`VerifyError::Io`] if the file cannot be opened or read.
    pub fn read(path: &Path) -> Result<Self> {
        let io_err = |source| VerifyError::Io {
            path: path.to_path_buf(),
            source,
        };
        let mut file = std::fs::File::open(path).map_err(io_err)?;
        tracing::info!(path = %path.display(), "opened log file");
        let mut content = Vec::new();
        let _ = file.read_to_end(&mut content).map_err(io_err)?;
        tracing::debug!(
            path = %path.display(),
            content = %String::from_utf8_lossy(&content),
            "log file content"
        );
        Ok(Self {
            path: path.to_path_buf(),
            content,
        })
    }

    /// Path the content was read from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Raw file content.
    #[must_use]
    pub fn content(&self) -> &[u8] {
        &self.content
    }

    /// Decodes the records one line at a time, skipping blank lines.
    ///
    /// Each call starts again from the first line.
    pub fn records(&self) -> impl Iterator<Item = Result<LogRecord>> + '_ {
        self.content
            .split(|&b| b == b'\n')
            .enumerate()
            .filter(|(_, line)| !line.trim_ascii().is_empty())
            .map(|(idx, line)| {
                LogRecord::decode(line).map_err(|source| VerifyError::Decode {
                    path: self.path.clone(),
                    line: idx + 1,
                    source,
                })
            })
    }
}

/// Checks the log file of one container.
#[derive(Debug, Clone)]
pub struct LogVerifier {
    path: PathBuf,
}

impl LogVerifier {
    /// Verifier for `log_path` inside `log_directory`.
    #[must_use]
    pub fn new(log_directory: &Path, log_path: &Path) -> Self {
        Self {
            path: log_file_path(log_directory, log_path),
        }
    }

    /// Verifier for the log file `container` writes inside `sandbox`.
    ///
    /// # Errors
    ///
    /// Returns an error if the sandbox has no log directory or the container
    /// has no log path.
    pub fn for_container(sandbox: &SandboxHandle, container: &TrackedContainer) -> Result<Self> {
        let Some(dir) = sandbox.log_directory() else {
            return Err(VerifyError::NoLogDirectory {
                name: sandbox.name().to_string(),
            });
        };
        let Some(log_path) = container.log_path() else {
            return Err(VerifyError::NoLogPath {
                id: container.id().clone(),
            });
        };
        Ok(Self::new(dir, log_path))
    }

    /// Log file location.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Checks that the first record of the log has the expected payload and
    /// stream, returning it.
    ///
    /// # Errors
    ///
    /// Fails on I/O errors, a malformed first line, an empty log, or a
    /// content mismatch.
    pub fn verify(&self, expected: &ExpectedLog) -> Result<LogRecord> {
        let mut matched = self.verify_with(expected, MatchPolicy::First)?;
        matched.pop().ok_or_else(|| self.no_records())
    }

    /// Checks the log against `expected` under `policy`, returning the
    /// matching records.
    ///
    /// Every decoded line must be well formed, except under
    /// [`MatchPolicy::First`] which stops after the first line.
    ///
    /// # Errors
    ///
    /// Fails on I/O or decode errors, an empty log, or when `policy` is not
    /// satisfied.
    pub fn verify_with(
        &self,
        expected: &ExpectedLog,
        policy: MatchPolicy,
    ) -> Result<Vec<LogRecord>> {
        let file = LogFile::read(&self.path)?;
        let mut records = file.records();

        let matched = match policy {
            MatchPolicy::First => {
                let Some(first) = records.next() else {
                    return Err(self.no_records());
                };
                let record = first?;
                expected.check(&self.path, &record)?;
                vec![record]
            }
            MatchPolicy::Any => {
                let mut seen = 0usize;
                let mut hits = Vec::new();
                for record in records {
                    let record = record?;
                    seen += 1;
                    if expected.matches(&record) {
                        hits.push(record);
                    }
                }
                if seen == 0 {
                    return Err(self.no_records());
                }
                if hits.is_empty() {
                    return Err(VerifyError::NoMatch {
                        path: self.path.clone(),
                        expected: expected.to_string(),
                    });
                }
                hits
            }
            MatchPolicy::All => {
                let mut all = Vec::new();
                for record in records {
                    let record = record?;
                    expected.check(&self.path, &record)?;
                    all.push(record);
                }
                if all.is_empty() {
                    return Err(self.no_records());
                }
                all
            }
        };
        tracing::info!(
            path = %self.path.display(),
            ?policy,
            matched = matched.len(),
            "log verified"
        );
        Ok(matched)
    }

    fn no_records(&self) -> VerifyError {
        VerifyError::NoRecords {
            path: self.path.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HELLO: &str =
        r#"{"log":"hello world\n","stream":"stdout","time":"2016-10-20T18:39:20.57606443Z"}"#;
    const ERR: &str =
        r#"{"log":"oops\n","stream":"stderr","time":"2016-10-20T18:39:20.57606444Z"}"#;
    const STDIN: &str =
        r#"{"log":"hello world\n","stream":"stdin","time":"2016-10-20T18:39:20.57606443Z"}"#;
    const NO_STREAM: &str = r#"{"log":"hello world","time":"2016-10-20T18:39:20.57606443Z"}"#;

    fn write_log(lines: &[&str]) -> (tempfile::TempDir, LogVerifier) {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("c.log");
        let mut content = lines.join("\n");
        content.push('\n');
        std::fs::write(path, content).expect("write");
        let verifier = LogVerifier::new(dir.path(), Path::new("c.log"));
        (dir, verifier)
    }

    fn mismatched_field(err: &VerifyError) -> Option<&'static str> {
        match err {
            VerifyError::ContentMismatch { field, .. } => Some(*field),
            _ => None,
        }
    }

    #[test]
    fn single_matching_record_verifies() {
        let (_dir, verifier) = write_log(&[HELLO]);
        let expected = ExpectedLog::stdout("hello world");
        let record = verifier.verify(&expected).expect("verify");
        assert_eq!(record.payload, b"hello world");
    }

    #[test]
    fn payload_mismatch_names_the_log_file() {
        let (_dir, verifier) = write_log(&[HELLO]);
        let expected = ExpectedLog::stdout("goodbye");
        let err = verifier.verify(&expected).unwrap_err();
        assert_eq!(mismatched_field(&err), Some("payload"));
        let shown = verifier.path().display().to_string();
        assert!(err.to_string().contains(&shown));
        match err {
            VerifyError::ContentMismatch { path, .. } => assert_eq!(path, verifier.path()),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn stream_mismatch_is_reported() {
        let (_dir, verifier) = write_log(&[HELLO]);
        let expected = ExpectedLog::stderr("hello world");
        let err = verifier.verify(&expected).unwrap_err();
        assert_eq!(mismatched_field(&err), Some("stream"));
    }

    #[test]
    fn unknown_stream_tag_fails_comparison() {
        let (_dir, verifier) = write_log(&[STDIN]);
        let expected = ExpectedLog::stdout("hello world");
        let err = verifier.verify(&expected).unwrap_err();
        assert_eq!(mismatched_field(&err), Some("stream"));
        assert!(err.to_string().contains("stdin"));
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let verifier = LogVerifier::new(dir.path(), Path::new("absent.log"));
        let err = verifier.verify(&ExpectedLog::stdout("x")).unwrap_err();
        assert!(matches!(err, VerifyError::Io { .. }));
    }

    #[test]
    fn missing_stream_field_is_decode_error() {
        let (_dir, verifier) = write_log(&[NO_STREAM]);
        let expected = ExpectedLog::stdout("hello world");
        let err = verifier.verify(&expected).unwrap_err();
        assert!(matches!(err, VerifyError::Decode { line: 1, .. }));
    }

    #[test]
    fn empty_file_has_no_records() {
        let (_dir, verifier) = write_log(&[""]);
        let expected = ExpectedLog::stdout("x");
        for policy in [MatchPolicy::First, MatchPolicy::Any, MatchPolicy::All] {
            let err = verifier.verify_with(&expected, policy).unwrap_err();
            assert!(matches!(err, VerifyError::NoRecords { .. }));
        }
    }

    #[test]
    fn first_policy_ignores_later_lines() {
        let (_dir, verifier) = write_log(&[HELLO, "not json"]);
        let expected = ExpectedLog::stdout("hello world");
        assert!(verifier.verify(&expected).is_ok());
    }

    #[test]
    fn any_policy_finds_later_record() {
        let (_dir, verifier) = write_log(&[HELLO, ERR]);
        let oops = ExpectedLog::stderr("oops");
        let hits = verifier.verify_with(&oops, MatchPolicy::Any).expect("any");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].stream, StreamTag::Stderr);

        let absent = ExpectedLog::stdout("absent");
        let err = verifier.verify_with(&absent, MatchPolicy::Any).unwrap_err();
        assert!(matches!(err, VerifyError::NoMatch { .. }));
    }

    #[test]
    fn all_policy_requires_every_record() {
        let expected = ExpectedLog::stdout("hello world");
        let (_dir, verifier) = write_log(&[HELLO, HELLO]);
        let all = verifier
            .verify_with(&expected, MatchPolicy::All)
            .expect("all");
        assert_eq!(all.len(), 2);

        let (_dir, verifier) = write_log(&[HELLO, ERR]);
        let err = verifier
            .verify_with(&expected, MatchPolicy::All)
            .unwrap_err();
        assert_eq!(mismatched_field(&err), Some("payload"));
    }

    #[test]
    fn records_are_restartable() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("c.log");
        let content = format!("{HELLO}\n\n{ERR}\n");
        std::fs::write(&path, content).expect("write");
        let file = LogFile::read(&path).expect("read");

        assert_eq!(file.records().count(), 2);
        let streams: Vec<_> = file.records().map(|r| r.expect("decode").stream).collect();
        assert_eq!(streams, vec![StreamTag::Stdout, StreamTag::Stderr]);
    }
}
