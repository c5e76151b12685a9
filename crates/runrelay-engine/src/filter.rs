//! Filter registry: run-level remove/flatten directives parsed into ordered
//! rule lists. Unrecognized tokens are ignored so a bad directive never
//! affects run execution.

use runrelay_types::KeywordType;

use crate::matcher::Matcher;

/// Full name of the retry-until-success construct the WUKS rule targets.
pub const WUKS_KEYWORD_NAME: &str = "BuiltIn.Wait Until Keyword Succeeds";

/// Which rule suppressed a node. End-of-node handling branches on this, so
/// the discriminant is stored on the node instead of a reference back into
/// the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveReason {
    /// Global policy: keyword data removed unconditionally.
    All,
    /// Global policy: keyword data removed from passing items.
    AllPassed,
    Wuks,
    For,
    While,
    Name,
    Tag,
}

/// What a keyword looks like to the filter rules.
#[derive(Debug, Clone, Copy)]
pub struct FilterTarget<'a> {
    /// Full producer name, e.g. `BuiltIn.Sleep`.
    pub name: &'a str,
    pub tags: &'a [String],
    pub keyword_type: KeywordType,
}

#[derive(Debug, Clone)]
pub enum RemoveRule {
    Wuks,
    For,
    While,
    Name(Matcher),
    Tag(Matcher),
}

impl RemoveRule {
    pub fn reason(&self) -> RemoveReason {
        match self {
            RemoveRule::Wuks => RemoveReason::Wuks,
            RemoveRule::For => RemoveReason::For,
            RemoveRule::While => RemoveReason::While,
            RemoveRule::Name(_) => RemoveReason::Name,
            RemoveRule::Tag(_) => RemoveReason::Tag,
        }
    }

    pub fn matches(&self, target: &FilterTarget<'_>) -> bool {
        match self {
            RemoveRule::Wuks => target.name.eq_ignore_ascii_case(WUKS_KEYWORD_NAME),
            RemoveRule::For => target.keyword_type == KeywordType::For,
            RemoveRule::While => target.keyword_type == KeywordType::While,
            RemoveRule::Name(matcher) => matcher.matches(target.name),
            RemoveRule::Tag(matcher) => target.tags.iter().any(|tag| matcher.matches(tag)),
        }
    }
}

#[derive(Debug, Clone)]
pub enum FlattenRule {
    For,
    While,
    Name(Matcher),
    Tag(Matcher),
}

impl FlattenRule {
    pub fn matches(&self, target: &FilterTarget<'_>) -> bool {
        match self {
            FlattenRule::For => target.keyword_type == KeywordType::For,
            FlattenRule::While => target.keyword_type == KeywordType::While,
            FlattenRule::Name(matcher) => matcher.matches(target.name),
            FlattenRule::Tag(matcher) => target.tags.iter().any(|tag| matcher.matches(tag)),
        }
    }
}

/// Parsed `--remove-keywords` directives.
#[derive(Debug, Clone, Default)]
pub struct RemoveFilters {
    /// Ordered rules; the first match wins.
    pub rules: Vec<RemoveRule>,
    pub remove_all: bool,
    pub remove_all_passed: bool,
}

impl RemoveFilters {
    /// Parse directives in order. `ALL` and `PASSED` win outright and stop
    /// further processing.
    pub fn parse(directives: &[String]) -> Self {
        let mut filters = RemoveFilters::default();
        for directive in directives {
            let token = directive.trim();
            if token.eq_ignore_ascii_case("ALL") {
                filters.remove_all = true;
                break;
            }
            if token.eq_ignore_ascii_case("PASSED") {
                filters.remove_all_passed = true;
                break;
            }
            if token.eq_ignore_ascii_case("WUKS") {
                filters.rules.push(RemoveRule::Wuks);
            } else if token.eq_ignore_ascii_case("FOR") {
                filters.rules.push(RemoveRule::For);
            } else if token.eq_ignore_ascii_case("WHILE") {
                filters.rules.push(RemoveRule::While);
            } else if let Some(glob) = prefixed(token, "NAME:") {
                filters
                    .rules
                    .push(RemoveRule::Name(Matcher::compile(Some(glob))));
            } else if let Some(glob) = prefixed(token, "TAG:") {
                filters
                    .rules
                    .push(RemoveRule::Tag(Matcher::compile(Some(glob))));
            }
        }
        filters
    }

    /// Global policy active for every item, independent of per-rule matches.
    pub fn global_reason(&self) -> Option<RemoveReason> {
        if self.remove_all {
            Some(RemoveReason::All)
        } else if self.remove_all_passed {
            Some(RemoveReason::AllPassed)
        } else {
            None
        }
    }

    pub fn first_match(&self, target: &FilterTarget<'_>) -> Option<&RemoveRule> {
        self.rules.iter().find(|rule| rule.matches(target))
    }
}

/// Parsed `--flatten-keywords` directives.
#[derive(Debug, Clone, Default)]
pub struct FlattenFilters {
    pub rules: Vec<FlattenRule>,
}

impl FlattenFilters {
    pub fn parse(directives: &[String]) -> Self {
        let mut filters = FlattenFilters::default();
        for directive in directives {
            let token = directive.trim();
            if token.eq_ignore_ascii_case("FOR") {
                filters.rules.push(FlattenRule::For);
            } else if token.eq_ignore_ascii_case("WHILE") {
                filters.rules.push(FlattenRule::While);
            } else if token.eq_ignore_ascii_case("ITERATION")
                || token.eq_ignore_ascii_case("FORITEM")
            {
                filters.rules.push(FlattenRule::For);
                filters.rules.push(FlattenRule::While);
            } else if let Some(glob) = prefixed(token, "NAME:") {
                filters
                    .rules
                    .push(FlattenRule::Name(Matcher::compile(Some(glob))));
            } else if let Some(glob) = prefixed(token, "TAG:") {
                filters
                    .rules
                    .push(FlattenRule::Tag(Matcher::compile(Some(glob))));
            }
        }
        filters
    }

    pub fn matches(&self, target: &FilterTarget<'_>) -> bool {
        self.rules.iter().any(|rule| rule.matches(target))
    }
}

fn prefixed<'a>(token: &'a str, prefix: &str) -> Option<&'a str> {
    let (head, tail) = token.split_at_checked(prefix.len())?;
    head.eq_ignore_ascii_case(prefix).then_some(tail)
}
