//! Glob-style matcher over node names and tags.

use regex::Regex;

/// Anchored glob matcher: `*` matches any run of characters, `?` exactly
/// one. Matching ignores case, the way the producer's own filters behave.
/// An absent pattern matches everything; an empty pattern matches only the
/// empty string.
#[derive(Debug, Clone)]
pub struct Matcher {
    pattern: Option<Regex>,
}

impl Matcher {
    pub fn compile(glob: Option<&str>) -> Self {
        let Some(glob) = glob else {
            return Matcher { pattern: None };
        };

        let mut pattern = String::with_capacity(glob.len() + 8);
        pattern.push_str("(?i)^");
        for ch in glob.chars() {
            match ch {
                '*' => pattern.push_str(".*"),
                '?' => pattern.push('.'),
                c if is_regex_metacharacter(c) => {
                    pattern.push('\\');
                    pattern.push(c);
                }
                c => pattern.push(c),
            }
        }
        pattern.push('$');

        // Every metacharacter is escaped above, so compilation cannot fail.
        let compiled = Regex::new(&pattern).expect("escaped glob is a valid regex");
        Matcher {
            pattern: Some(compiled),
        }
    }

    pub fn matches(&self, value: &str) -> bool {
        match &self.pattern {
            Some(regex) => regex.is_match(value),
            None => true,
        }
    }
}

fn is_regex_metacharacter(c: char) -> bool {
    matches!(
        c,
        '\\' | '.' | '+' | '(' | ')' | '[' | ']' | '{' | '}' | '^' | '$' | '|'
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_string_anchoring() {
        let matcher = Matcher::compile(Some("Log"));
        assert!(matcher.matches("Log"));
        assert!(!matcher.matches("Log Something"));
        assert!(!matcher.matches("My Log"));
    }

    #[test]
    fn test_wildcards() {
        let star = Matcher::compile(Some("Log*"));
        assert!(star.matches("Log"));
        assert!(star.matches("Log Something"));
        assert!(!star.matches("BuiltIn.Log"));

        let question = Matcher::compile(Some("s?"));
        assert!(question.matches("s1"));
        assert!(!question.matches("s12"));
        assert!(!question.matches("s"));
    }

    #[test]
    fn test_case_insensitive() {
        let matcher = Matcher::compile(Some("click*"));
        assert!(matcher.matches("Click Button"));
        assert!(matcher.matches("CLICK LINK"));
    }

    #[test]
    fn test_empty_glob_matches_only_empty() {
        let matcher = Matcher::compile(Some(""));
        assert!(matcher.matches(""));
        assert!(!matcher.matches("anything"));
    }

    #[test]
    fn test_absent_glob_matches_everything() {
        let matcher = Matcher::compile(None);
        assert!(matcher.matches(""));
        assert!(matcher.matches("anything at all"));
    }

    #[test]
    fn test_metacharacters_are_literal() {
        let matcher = Matcher::compile(Some("Check (value)"));
        assert!(matcher.matches("Check (value)"));
        assert!(!matcher.matches("Check value"));
    }
}
