//! Item entities built from producer start events.
//!
//! These hold the start-time attributes a node needs to build its backend
//! creation request, possibly long after the start event when a buffered
//! subtree is replayed. End-of-item state (status, end time) lives on the
//! publisher's node, not here.

use crate::event::{KeywordStart, SuiteStart, TestStart};
use crate::status::{ItemKind, KeywordType};

const TEST_CASE_ID_TAG_PREFIX: &str = "test_case_id:";
const KEYWORD_NAME_LIMIT: usize = 256;

/// A test suite.
#[derive(Debug, Clone)]
pub struct Suite {
    pub name: String,
    pub attributes: SuiteStart,
}

impl Suite {
    pub fn new(name: impl Into<String>, attributes: SuiteStart) -> Self {
        Suite {
            name: name.into(),
            attributes,
        }
    }

    /// Suite metadata rendered as `key:value` item attributes.
    pub fn item_attributes(&self) -> Vec<String> {
        self.attributes
            .metadata
            .iter()
            .map(|(key, value)| format!("{}:{}", key, value))
            .collect()
    }
}

/// A test case.
#[derive(Debug, Clone)]
pub struct Test {
    pub name: String,
    pub attributes: TestStart,
}

impl Test {
    pub fn new(name: impl Into<String>, attributes: TestStart) -> Self {
        Test {
            name: name.into(),
            attributes,
        }
    }

    /// Tags reported to the backend, excluding the test-case-id carrier tag.
    pub fn reported_tags(&self) -> Vec<&str> {
        self.attributes
            .tags
            .iter()
            .filter(|tag| !tag.starts_with(TEST_CASE_ID_TAG_PREFIX))
            .map(String::as_str)
            .collect()
    }

    /// Test case id carried through the tags, if any.
    pub fn test_case_id(&self) -> Option<&str> {
        self.attributes
            .tags
            .iter()
            .find_map(|tag| tag.strip_prefix(TEST_CASE_ID_TAG_PREFIX))
    }

    /// `source:name` reference to the test definition; absent when the
    /// producer did not supply a source.
    pub fn code_ref(&self) -> Option<String> {
        self.attributes
            .source
            .as_ref()
            .map(|source| format!("{}:{}", source.display(), self.name))
    }
}

/// A keyword (test step), possibly nested.
#[derive(Debug, Clone)]
pub struct Keyword {
    /// Full producer name, e.g. `BuiltIn.Log`.
    pub name: String,
    /// Kind of the enclosing item; setup/teardown typing depends on it.
    pub parent_kind: ItemKind,
    pub attributes: KeywordStart,
}

impl Keyword {
    pub fn new(name: impl Into<String>, parent_kind: ItemKind, attributes: KeywordStart) -> Self {
        Keyword {
            name: name.into(),
            parent_kind,
            attributes,
        }
    }

    pub fn keyword_type(&self) -> KeywordType {
        self.attributes.keyword_type
    }

    /// Display name for the backend: `assign = name (args)`, capped at the
    /// backend's item name limit.
    pub fn display_name(&self) -> String {
        let mut full = String::new();
        if !self.attributes.assign.is_empty() {
            full.push_str(&self.attributes.assign.join(", "));
            full.push_str(" = ");
        }
        full.push_str(&self.name);
        full.push_str(" (");
        full.push_str(&self.attributes.args.join(", "));
        full.push(')');
        if full.chars().count() > KEYWORD_NAME_LIMIT {
            full = full.chars().take(KEYWORD_NAME_LIMIT).collect();
        }
        full
    }

    /// Backend item type. Setup and teardown keywords report as before/after
    /// their parent item; everything else is a plain step.
    pub fn item_type(&self) -> String {
        match self.attributes.keyword_type {
            KeywordType::Setup => format!("BEFORE_{}", self.parent_kind),
            KeywordType::Teardown => format!("AFTER_{}", self.parent_kind),
            _ => "STEP".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn keyword_start(assign: &[&str], args: &[&str]) -> KeywordStart {
        KeywordStart {
            kwname: "Log".to_string(),
            libname: "BuiltIn".to_string(),
            keyword_type: KeywordType::Keyword,
            args: args.iter().map(|a| a.to_string()).collect(),
            assign: assign.iter().map(|a| a.to_string()).collect(),
            tags: Vec::new(),
            doc: String::new(),
            start_time: Utc::now(),
        }
    }

    #[test]
    fn test_keyword_display_name() {
        let plain = Keyword::new("BuiltIn.Log", ItemKind::Test, keyword_start(&[], &["hello"]));
        assert_eq!(plain.display_name(), "BuiltIn.Log (hello)");

        let assigned = Keyword::new(
            "BuiltIn.Evaluate",
            ItemKind::Test,
            keyword_start(&["${result}"], &["1 + 1"]),
        );
        assert_eq!(assigned.display_name(), "${result} = BuiltIn.Evaluate (1 + 1)");
    }

    #[test]
    fn test_keyword_display_name_capped() {
        let long_arg = "x".repeat(400);
        let kwd = Keyword::new(
            "BuiltIn.Log",
            ItemKind::Test,
            keyword_start(&[], &[long_arg.as_str()]),
        );
        assert_eq!(kwd.display_name().chars().count(), 256);
    }

    #[test]
    fn test_keyword_item_type() {
        let mut attributes = keyword_start(&[], &[]);
        attributes.keyword_type = KeywordType::Setup;
        let setup = Keyword::new("Open Browser", ItemKind::Suite, attributes.clone());
        assert_eq!(setup.item_type(), "BEFORE_SUITE");

        attributes.keyword_type = KeywordType::Teardown;
        let teardown = Keyword::new("Close Browser", ItemKind::Test, attributes.clone());
        assert_eq!(teardown.item_type(), "AFTER_TEST");

        attributes.keyword_type = KeywordType::For;
        let step = Keyword::new("FOR", ItemKind::Test, attributes);
        assert_eq!(step.item_type(), "STEP");
    }

    #[test]
    fn test_test_case_id_and_tags() {
        let test = Test::new(
            "Login works",
            TestStart {
                id: "s1-t1".to_string(),
                longname: "Suite.Login works".to_string(),
                doc: String::new(),
                tags: vec!["smoke".to_string(), "test_case_id:C-101".to_string()],
                source: Some("tests/login.robot".into()),
                start_time: Utc::now(),
            },
        );
        assert_eq!(test.test_case_id(), Some("C-101"));
        assert_eq!(test.reported_tags(), vec!["smoke"]);
        assert_eq!(test.code_ref().unwrap(), "tests/login.robot:Login works");
    }
}
