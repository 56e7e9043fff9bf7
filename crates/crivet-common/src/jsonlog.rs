//! Docker-style JSON-line log records.
//!
//! Each line of a captured container log is one JSON object:
//!
//! ```text
//! {"log":"content 1\n","stream":"stdout","time":"2016-10-20T18:39:20.57606443Z"}
//! ```
//!
//! The `log` field carries the output line including its own terminator.
//! The decoded payload drops that terminator.

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CrivetError, Result};

/// Line terminator appended by the producer to every captured line.
const EOL: char = '\n';

/// Output stream a log record was captured from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum StreamTag {
    /// Standard output.
    Stdout,
    /// Standard error.
    Stderr,
    /// Any other tag, kept verbatim so that comparisons fail instead of
    /// decoding.
    Other(String),
}

impl StreamTag {
    /// Returns the wire name of the stream.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Stdout => "stdout",
            Self::Stderr => "stderr",
            Self::Other(tag) => tag,
        }
    }
}

impl From<&str> for StreamTag {
    fn from(tag: &str) -> Self {
        match tag {
            "stdout" => Self::Stdout,
            "stderr" => Self::Stderr,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for StreamTag {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "stdout" => Self::Stdout,
            "stderr" => Self::Stderr,
            _ => Self::Other(tag),
        }
    }
}

impl From<StreamTag> for String {
    fn from(tag: StreamTag) -> Self {
        match tag {
            StreamTag::Other(tag) => tag,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for StreamTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One decoded unit of captured container output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    /// Time the producer captured the line.
    pub timestamp: DateTime<Utc>,
    /// Stream the line was written to.
    pub stream: StreamTag,
    /// Line content without its terminator.
    pub payload: Vec<u8>,
}

/// Wire shape of a record. All three fields are required.
#[derive(Debug, Deserialize)]
struct JsonLog {
    log: String,
    stream: StreamTag,
    time: DateTime<Utc>,
}

impl LogRecord {
    /// Creates a record stamped with the current time.
    #[must_use]
    pub fn new(stream: StreamTag, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            timestamp: Utc::now(),
            stream,
            payload: payload.into(),
        }
    }

    /// Returns the payload as text, replacing invalid UTF-8.
    #[must_use]
    pub fn payload_lossy(&self) -> String {
        String::from_utf8_lossy(&self.payload).into_owned()
    }

    /// Decodes one JSON log line.
    ///
    /// Surrounding whitespace, including the line's own newline, is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`CrivetError::Decode`] if the line is not a JSON object with
    /// string `log`, `stream` and RFC3339 `time` fields.
    pub fn decode(line: &[u8]) -> Result<Self> {
        let raw: JsonLog = serde_json::from_slice(line.trim_ascii()).map_err(|e| {
            CrivetError::Decode {
                message: e.to_string(),
            }
        })?;
        let mut log = raw.log;
        if log.ends_with(EOL) {
            let _ = log.pop();
        }
        Ok(Self {
            timestamp: raw.time,
            stream: raw.stream,
            payload: log.into_bytes(),
        })
    }

    /// Encodes the record as one JSON line, without a trailing newline.
    ///
    /// # Errors
    ///
    /// Returns [`CrivetError::Serialization`] if encoding fails.
    pub fn to_json_line(&self) -> Result<String> {
        #[derive(Serialize)]
        struct JsonLogRef<'a> {
            log: String,
            stream: &'a str,
            time: String,
        }

        let mut log = self.payload_lossy();
        log.push(EOL);
        let line = serde_json::to_string(&JsonLogRef {
            log,
            stream: self.stream.as_str(),
            time: self.timestamp.to_rfc3339_opts(SecondsFormat::Nanos, true),
        })?;
        Ok(line)
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn instant() -> DateTime<Utc> {
        NaiveDate::from_ymd_opt(2016, 10, 20)
            .unwrap()
            .and_hms_nano_opt(18, 39, 20, 576_064_430)
            .unwrap()
            .and_utc()
    }

    #[test]
    fn decodes_reference_line() {
        let line =
            br#"{"log":"hello world","stream":"stdout","time":"2016-10-20T18:39:20.57606443Z"}"#;
        let record = LogRecord::decode(line).expect("decode");
        assert_eq!(record.payload, b"hello world");
        assert_eq!(record.stream, StreamTag::Stdout);
        assert_eq!(record.timestamp, instant());
    }

    #[test]
    fn strips_single_trailing_newline_from_payload() {
        let line = br#"{"log":"two\n\n","stream":"stderr","time":"2016-10-20T18:39:20.57606443Z"}"#;
        let record = LogRecord::decode(line).expect("decode");
        assert_eq!(record.payload, b"two\n");
        assert_eq!(record.stream, StreamTag::Stderr);
    }

    #[test]
    fn preserves_unknown_stream_tag() {
        let line = br#"{"log":"x","stream":"stdin","time":"2016-10-20T18:39:20Z"}"#;
        let record = LogRecord::decode(line).expect("decode");
        assert_eq!(record.stream, StreamTag::Other("stdin".into()));
        assert_eq!(record.stream.as_str(), "stdin");
    }

    #[test]
    fn missing_stream_is_decode_error() {
        let line = br#"{"log":"hello world","time":"2016-10-20T18:39:20.57606443Z"}"#;
        let err = LogRecord::decode(line).unwrap_err();
        assert!(matches!(err, CrivetError::Decode { .. }));
        assert!(err.to_string().contains("stream"));
    }

    #[test]
    fn bad_timestamp_is_decode_error() {
        let line = br#"{"log":"x","stream":"stdout","time":"yesterday"}"#;
        assert!(matches!(
            LogRecord::decode(line),
            Err(CrivetError::Decode { .. })
        ));
    }

    #[test]
    fn non_object_is_decode_error() {
        assert!(LogRecord::decode(b"hello world").is_err());
        assert!(LogRecord::decode(b"").is_err());
    }

    #[test]
    fn encoded_line_carries_terminator_and_nanos() {
        let record = LogRecord {
            timestamp: instant(),
            stream: StreamTag::Stdout,
            payload: b"hello world".to_vec(),
        };
        let line = record.to_json_line().expect("encode");
        assert_eq!(
            line,
            r#"{"log":"hello world\n","stream":"stdout","time":"2016-10-20T18:39:20.576064430Z"}"#
        );
        assert_eq!(LogRecord::decode(line.as_bytes()).expect("decode"), record);
    }
}
