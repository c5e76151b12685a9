//! Wire request payloads and the producer→backend vocabulary mappings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use runrelay_types::{
    Attachment, Keyword, LaunchAttribute, LaunchStart, LogLevel, LogRecord, Status, Suite, Test,
};

use crate::backend::ItemId;

/// Backend status vocabulary. Skipped and not-run items both report as
/// skipped.
pub fn wire_status(status: Status) -> &'static str {
    match status {
        Status::Pass => "PASSED",
        Status::Fail => "FAILED",
        Status::Skip | Status::NotRun => "SKIPPED",
    }
}

/// Backend log-level vocabulary; producer-only levels fold into it.
pub fn wire_level(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Trace => "TRACE",
        LogLevel::Debug => "DEBUG",
        LogLevel::Info | LogLevel::Html | LogLevel::Skip => "INFO",
        LogLevel::Warn => "WARN",
        LogLevel::Error | LogLevel::Fail => "ERROR",
    }
}

/// Epoch-millisecond string, the backend's timestamp format.
pub fn epoch_millis(ts: DateTime<Utc>) -> String {
    ts.timestamp_millis().to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartLaunchRequest {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<LaunchAttribute>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    pub rerun: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rerun_of: Option<String>,
    pub start_time: String,
}

impl StartLaunchRequest {
    pub fn new(launch: &LaunchStart) -> Self {
        StartLaunchRequest {
            name: launch.name.clone(),
            description: (!launch.doc.is_empty()).then(|| launch.doc.clone()),
            attributes: launch.attributes.clone(),
            mode: launch.mode.clone(),
            rerun: launch.rerun,
            rerun_of: launch.rerun_of.clone(),
            start_time: epoch_millis(launch.start_time),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartItemRequest {
    pub name: String,
    pub item_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_item_id: Option<ItemId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_ref: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_case_id: Option<String>,
    pub has_stats: bool,
    pub start_time: String,
}

impl StartItemRequest {
    pub fn for_suite(suite: &Suite, parent: Option<&ItemId>) -> Self {
        StartItemRequest {
            name: suite.name.clone(),
            item_type: "SUITE".to_string(),
            description: description(&suite.attributes.doc),
            parent_item_id: parent.cloned(),
            attributes: suite.item_attributes(),
            code_ref: None,
            test_case_id: None,
            has_stats: true,
            start_time: epoch_millis(suite.attributes.start_time),
        }
    }

    // Tests are created as STEP items; the backend derives statistics from
    // has_stats, not from the type name.
    pub fn for_test(test: &Test, parent: Option<&ItemId>) -> Self {
        StartItemRequest {
            name: test.name.clone(),
            item_type: "STEP".to_string(),
            description: description(&test.attributes.doc),
            parent_item_id: parent.cloned(),
            attributes: test.reported_tags().iter().map(|t| t.to_string()).collect(),
            code_ref: test.code_ref(),
            test_case_id: test.test_case_id().map(str::to_string),
            has_stats: true,
            start_time: epoch_millis(test.attributes.start_time),
        }
    }

    pub fn for_keyword(keyword: &Keyword, parent: Option<&ItemId>) -> Self {
        StartItemRequest {
            name: keyword.display_name(),
            item_type: keyword.item_type(),
            description: description(&keyword.attributes.doc),
            parent_item_id: parent.cloned(),
            attributes: Vec::new(),
            code_ref: None,
            test_case_id: None,
            has_stats: false,
            start_time: epoch_millis(keyword.attributes.start_time),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinishRequest {
    pub end_time: String,
    pub status: String,
}

impl FinishRequest {
    pub fn new(end_time: DateTime<Utc>, status: Status) -> Self {
        FinishRequest {
            end_time: epoch_millis(end_time),
            status: wire_status(status).to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogRequest {
    /// Absent for launch-level logs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_id: Option<ItemId>,
    pub level: String,
    pub message: String,
    pub time: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachment: Option<Attachment>,
}

impl LogRequest {
    /// Build a log request; `fallback_time` is used when the record carries
    /// no timestamp of its own.
    pub fn new(item_id: Option<ItemId>, record: &LogRecord, fallback_time: DateTime<Utc>) -> Self {
        LogRequest {
            item_id,
            level: wire_level(record.level).to_string(),
            message: record.message.clone(),
            time: epoch_millis(record.timestamp.unwrap_or(fallback_time)),
            attachment: record.attachment.clone(),
        }
    }
}

fn description(doc: &str) -> Option<String> {
    (!doc.is_empty()).then(|| doc.to_string())
}
