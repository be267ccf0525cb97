//! Java name helpers shared by the parser, the index and test definitions.

use regex::Regex;

/// Last segment of a dotted name: `org.junit.Test` → `Test`.
pub fn simple_name(name: &str) -> &str {
    name.rsplit('.').next().unwrap_or(name)
}

/// Everything before the last dot, empty for unqualified names.
pub fn qualifier(name: &str) -> &str {
    name.rsplit_once('.').map(|(q, _)| q).unwrap_or("")
}

/// Drop type arguments and array dimensions: `Base<T>[]` → `Base`.
pub fn erase_type(written: &str) -> &str {
    let end = written.find(|c: char| c == '<' || c == '[').unwrap_or(written.len());
    written[..end].trim()
}

/// Wildcard name pattern as understood by declaration searches.
///
/// `*` matches any run of characters, `?` exactly one; matching is
/// case-sensitive and anchored at both ends.
#[derive(Debug, Clone)]
pub struct NamePattern {
    source: String,
    regex: Option<Regex>,
}

impl NamePattern {
    pub fn new(pattern: &str) -> Self {
        let mut expr = String::with_capacity(pattern.len() + 8);
        expr.push('^');
        for c in pattern.chars() {
            match c {
                '*' => expr.push_str(".*"),
                '?' => expr.push('.'),
                _ => expr.push_str(&regex::escape(c.encode_utf8(&mut [0; 4]))),
            }
        }
        expr.push('$');

        Self {
            source: pattern.to_string(),
            regex: Regex::new(&expr).ok(),
        }
    }

    /// Pattern matching every name.
    pub fn any() -> Self {
        Self::new("*")
    }

    pub fn matches(&self, name: &str) -> bool {
        self.regex.as_ref().is_some_and(|r| r.is_match(name))
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_name_and_qualifier() {
        assert_eq!(simple_name("org.junit.Test"), "Test");
        assert_eq!(simple_name("Test"), "Test");
        assert_eq!(qualifier("org.junit.Test"), "org.junit");
        assert_eq!(qualifier("Test"), "");
    }

    #[test]
    fn test_erase_type() {
        assert_eq!(erase_type("Base<String>"), "Base");
        assert_eq!(erase_type("int[]"), "int");
        assert_eq!(erase_type("junit.framework.TestCase"), "junit.framework.TestCase");
    }

    #[test]
    fn test_name_pattern() {
        assert!(NamePattern::any().matches("Anything"));
        assert!(NamePattern::any().matches(""));

        let pattern = NamePattern::new("*Test");
        assert!(pattern.matches("CalcTest"));
        assert!(!pattern.matches("CalcTests"));

        let single = NamePattern::new("Calc?");
        assert!(single.matches("Calc1"));
        assert!(!single.matches("Calc"));

        assert!(NamePattern::new("a.b").matches("a.b"));
        assert!(!NamePattern::new("a.b").matches("axb"));
    }
}
