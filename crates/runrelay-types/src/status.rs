use serde::{Deserialize, Serialize};
use std::fmt;

/// Final verdict of a suite, test or keyword, as reported by the producer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    #[serde(rename = "PASS")]
    Pass,
    #[serde(rename = "FAIL")]
    Fail,
    #[serde(rename = "SKIP")]
    Skip,
    #[serde(rename = "NOT RUN")]
    NotRun,
}

impl Status {
    pub fn is_fail(self) -> bool {
        matches!(self, Status::Fail)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Status::Pass => "PASS",
            Status::Fail => "FAIL",
            Status::Skip => "SKIP",
            Status::NotRun => "NOT RUN",
        };
        f.write_str(name)
    }
}

/// Producer-side log message severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Fail,
    Skip,
    Html,
}

/// One reporting unit in the launch → suite → test → keyword tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ItemKind {
    Launch,
    Suite,
    Test,
    Keyword,
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ItemKind::Launch => "LAUNCH",
            ItemKind::Suite => "SUITE",
            ItemKind::Test => "TEST",
            ItemKind::Keyword => "KEYWORD",
        };
        f.write_str(name)
    }
}

/// Producer keyword type; drives setup/teardown item typing and the
/// FOR/WHILE filter singletons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum KeywordType {
    #[default]
    #[serde(rename = "KEYWORD")]
    Keyword,
    #[serde(rename = "SETUP")]
    Setup,
    #[serde(rename = "TEARDOWN")]
    Teardown,
    #[serde(rename = "FOR")]
    For,
    #[serde(rename = "WHILE")]
    While,
    #[serde(rename = "ITERATION")]
    Iteration,
    #[serde(rename = "IF")]
    If,
    #[serde(rename = "ELSE IF")]
    ElseIf,
    #[serde(rename = "ELSE")]
    Else,
    #[serde(rename = "TRY")]
    Try,
    #[serde(rename = "EXCEPT")]
    Except,
    #[serde(rename = "FINALLY")]
    Finally,
}
