//! Producer-event builders with deterministic timestamps.

use std::path::Path;

use anyhow::Result;
use chrono::{DateTime, Duration, TimeZone, Utc};

use runrelay_types::{
    KeywordEnd, KeywordStart, KeywordType, LaunchStart, LogLevel, LogRecord, RunEvent, Status,
    SuiteEnd, SuiteStart, TestEnd, TestStart,
};

/// Fixed run epoch; every event time steps from it.
pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 14, 12, 0, 0).unwrap()
}

/// `base_time` plus the given number of seconds.
pub fn at(seconds: i64) -> DateTime<Utc> {
    base_time() + Duration::seconds(seconds)
}

pub fn launch_start(name: &str) -> LaunchStart {
    LaunchStart {
        name: name.to_string(),
        doc: String::new(),
        attributes: Vec::new(),
        mode: None,
        rerun: false,
        rerun_of: None,
        start_time: base_time(),
    }
}

pub fn suite_start(id: &str, longname: &str, seconds: i64) -> SuiteStart {
    SuiteStart {
        id: id.to_string(),
        longname: longname.to_string(),
        doc: String::new(),
        source: None,
        metadata: Default::default(),
        start_time: at(seconds),
    }
}

pub fn suite_end(status: Status, seconds: i64) -> SuiteEnd {
    SuiteEnd {
        status,
        end_time: at(seconds),
    }
}

pub fn test_start(id: &str, longname: &str, seconds: i64) -> TestStart {
    TestStart {
        id: id.to_string(),
        longname: longname.to_string(),
        doc: String::new(),
        tags: Vec::new(),
        source: Some("tests/demo.robot".into()),
        start_time: at(seconds),
    }
}

pub fn test_end(status: Status, seconds: i64) -> TestEnd {
    TestEnd {
        status,
        message: None,
        end_time: at(seconds),
    }
}

pub fn keyword_start(
    kwname: &str,
    libname: &str,
    keyword_type: KeywordType,
    seconds: i64,
) -> KeywordStart {
    KeywordStart {
        kwname: kwname.to_string(),
        libname: libname.to_string(),
        keyword_type,
        args: Vec::new(),
        assign: Vec::new(),
        tags: Vec::new(),
        doc: String::new(),
        start_time: at(seconds),
    }
}

pub fn keyword_end(status: Status, seconds: i64) -> KeywordEnd {
    KeywordEnd {
        status,
        end_time: at(seconds),
    }
}

pub fn log(level: LogLevel, message: &str) -> LogRecord {
    LogRecord {
        level,
        message: message.to_string(),
        attachment: None,
        timestamp: Some(base_time()),
        launch_log: false,
    }
}

/// A small complete run: one suite, one passing test with a single logged
/// keyword.
pub fn sample_run() -> Vec<RunEvent> {
    vec![
        RunEvent::StartLaunch {
            attributes: launch_start("Demo Launch"),
        },
        RunEvent::StartSuite {
            name: "Demo".to_string(),
            attributes: suite_start("s1", "Demo", 0),
        },
        RunEvent::StartTest {
            name: "Addition works".to_string(),
            attributes: test_start("s1-t1", "Demo.Addition works", 1),
        },
        RunEvent::StartKeyword {
            name: "BuiltIn.Log".to_string(),
            attributes: keyword_start("Log", "BuiltIn", KeywordType::Keyword, 2),
        },
        RunEvent::LogMessage {
            message: log(LogLevel::Info, "hello from the demo"),
        },
        RunEvent::EndKeyword {
            attributes: keyword_end(Status::Pass, 3),
        },
        RunEvent::EndTest {
            attributes: test_end(Status::Pass, 4),
        },
        RunEvent::EndSuite {
            attributes: suite_end(Status::Pass, 5),
        },
    ]
}

/// Write events as a JSON-lines run recording.
pub fn write_events(path: &Path, events: &[RunEvent]) -> Result<()> {
    let mut lines = String::new();
    for event in events {
        lines.push_str(&serde_json::to_string(event)?);
        lines.push('\n');
    }
    std::fs::write(path, lines)?;
    Ok(())
}
