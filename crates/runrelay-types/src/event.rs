//! Producer-event schema.
//!
//! One event per tree transition, delivered in strict nesting order by the
//! producer hooks and serialized as one JSON object per line when a run is
//! recorded. Attribute records are fixed and strongly typed per event kind;
//! fields that older producers do not supply are explicit options.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::status::{KeywordType, LogLevel, Status};
use crate::time::{timestamp, timestamp_opt};

/// A `key:value` attribute attached to the launch; bare tokens carry no key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchAttribute {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    pub value: String,
}

impl LaunchAttribute {
    pub fn parse(token: &str) -> Self {
        match token.split_once(':') {
            Some((key, value)) if !key.is_empty() && !value.is_empty() => LaunchAttribute {
                key: Some(key.to_string()),
                value: value.to_string(),
            },
            _ => LaunchAttribute {
                key: None,
                value: token.to_string(),
            },
        }
    }
}

/// Attributes supplied with the launch start event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaunchStart {
    pub name: String,
    #[serde(default)]
    pub doc: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<LaunchAttribute>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(default)]
    pub rerun: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rerun_of: Option<String>,
    #[serde(with = "timestamp")]
    pub start_time: DateTime<Utc>,
}

/// Attributes supplied with a suite start event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteStart {
    /// Producer-assigned suite id, e.g. `s1-s2`.
    pub id: String,
    pub longname: String,
    #[serde(default)]
    pub doc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
    #[serde(with = "timestamp")]
    pub start_time: DateTime<Utc>,
}

/// Attributes supplied with a suite end event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteEnd {
    pub status: Status,
    #[serde(with = "timestamp")]
    pub end_time: DateTime<Utc>,
}

/// Attributes supplied with a test start event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestStart {
    pub id: String,
    pub longname: String,
    #[serde(default)]
    pub doc: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Absent on older producer versions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<PathBuf>,
    #[serde(with = "timestamp")]
    pub start_time: DateTime<Utc>,
}

/// Attributes supplied with a test end event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestEnd {
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(with = "timestamp")]
    pub end_time: DateTime<Utc>,
}

/// Attributes supplied with a keyword start event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordStart {
    pub kwname: String,
    #[serde(default)]
    pub libname: String,
    #[serde(rename = "type", default)]
    pub keyword_type: KeywordType,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub assign: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default)]
    pub doc: String,
    #[serde(with = "timestamp")]
    pub start_time: DateTime<Utc>,
}

/// Attributes supplied with a keyword end event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordEnd {
    pub status: Status,
    #[serde(with = "timestamp")]
    pub end_time: DateTime<Utc>,
}

/// Binary payload shipped with a log message (screenshot, report file).
/// Base64 in the serialized form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub name: String,
    pub mime: String,
    #[serde(with = "base64_bytes")]
    pub data: Vec<u8>,
}

mod base64_bytes {
    use base64::Engine as _;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer, de};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        STANDARD.decode(raw.as_bytes()).map_err(de::Error::custom)
    }
}

/// A producer log message addressed to the innermost open item, or to the
/// launch itself when `launch_log` is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogRecord {
    pub level: LogLevel,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment: Option<Attachment>,
    #[serde(default, with = "timestamp_opt", skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub launch_log: bool,
}

impl LogRecord {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        LogRecord {
            level,
            message: message.into(),
            attachment: None,
            timestamp: None,
            launch_log: false,
        }
    }
}

/// One producer event, as recorded in a run stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RunEvent {
    StartLaunch {
        #[serde(flatten)]
        attributes: LaunchStart,
    },
    StartSuite {
        name: String,
        #[serde(flatten)]
        attributes: SuiteStart,
    },
    EndSuite {
        #[serde(flatten)]
        attributes: SuiteEnd,
    },
    StartTest {
        name: String,
        #[serde(flatten)]
        attributes: TestStart,
    },
    EndTest {
        #[serde(flatten)]
        attributes: TestEnd,
    },
    StartKeyword {
        name: String,
        #[serde(flatten)]
        attributes: KeywordStart,
    },
    EndKeyword {
        #[serde(flatten)]
        attributes: KeywordEnd,
    },
    LogMessage {
        #[serde(flatten)]
        message: LogRecord,
    },
}
