use crate::errors::{CoreError, Result};
use crate::types::MatchSensitivity;

pub mod fieldname;

/// Prefixes that force a regex to be matched sensitively.
const FORCE_SENSITIVE_PREFIXES: [&str; 2] = ["(?-i)", "(?c)"];
/// Prefix that forces a regex to be matched insensitively.
const FORCE_INSENSITIVE_PREFIX: &str = "(?i)";

pub fn regex_full_match(pattern: &str) -> String {
    let mut full_match_pattern = String::new();
    full_match_pattern.push_str(r"\A(");
    full_match_pattern.push_str(pattern);
    full_match_pattern.push_str(r")\z");

    full_match_pattern
}

/// Compile a pattern that has to match the complete value.
pub fn compile_full_match(pattern: &str) -> Result<regex::Regex> {
    regex::Regex::new(&regex_full_match(pattern)).map_err(|source| CoreError::InvalidRegex {
        pattern: pattern.to_string(),
        source,
    })
}

/// Remove leading `^` and a trailing unescaped `$` from a pattern.
///
/// Term regexes always match the complete value, so these anchors are redundant.
pub fn strip_anchors(pattern: &str) -> &str {
    let mut result = pattern.trim_start_matches('^');
    if let Some(without_dollar) = result.strip_suffix('$') {
        let backslashes = without_dollar
            .chars()
            .rev()
            .take_while(|c| *c == '\\')
            .count();
        if backslashes % 2 == 0 {
            result = without_dollar;
        }
    }
    result
}

/// True if the value is non-empty and consists of letters and digits only.
pub fn is_alphanumeric_only(value: &str) -> bool {
    !value.is_empty() && value.chars().all(char::is_alphanumeric)
}

pub fn escape_regex(value: &str) -> String {
    regex::escape(value)
}

/// Write a value as single-quoted string literal, escaping backslashes and quotes.
pub fn quote(value: &str) -> String {
    let mut result = String::with_capacity(value.len() + 2);
    result.push('\'');
    for c in value.chars() {
        if c == '\\' || c == '\'' {
            result.push('\\');
        }
        result.push(c);
    }
    result.push('\'');
    result
}

/// Split a sensitivity-forcing prefix from a regex.
///
/// Returns the forced sensitivity (if any) and the remaining pattern.
pub fn split_sensitivity_prefix(pattern: &str) -> (Option<MatchSensitivity>, &str) {
    for prefix in FORCE_SENSITIVE_PREFIXES.iter() {
        if let Some(rest) = pattern.strip_prefix(prefix) {
            return (Some(MatchSensitivity::Sensitive), rest);
        }
    }
    if let Some(rest) = pattern.strip_prefix(FORCE_INSENSITIVE_PREFIX) {
        return (Some(MatchSensitivity::Insensitive), rest);
    }
    (None, pattern)
}

/// Desensitize the literal parts of a regex, leaving escape sequences
/// (`\W`, `\p{Lu}`, ...) untouched.
pub fn desensitize_regex(pattern: &str, sensitivity: MatchSensitivity) -> String {
    if sensitivity == MatchSensitivity::Sensitive {
        return pattern.to_string();
    }
    let mut result = String::with_capacity(pattern.len());
    let mut literal = String::new();
    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            literal.push(c);
            continue;
        }
        result.push_str(&sensitivity.desensitize(&literal));
        literal.clear();
        result.push(c);
        if let Some(escaped) = chars.next() {
            result.push(escaped);
            if (escaped == 'p' || escaped == 'P') && chars.peek() == Some(&'{') {
                for class_char in chars.by_ref() {
                    result.push(class_char);
                    if class_char == '}' {
                        break;
                    }
                }
            }
        }
    }
    result.push_str(&sensitivity.desensitize(&literal));
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn anchors_are_stripped() {
        assert_eq!("fo.*", strip_anchors("^fo.*$"));
        assert_eq!("fo.*", strip_anchors("^^fo.*"));
        assert_eq!("a\\$", strip_anchors("a\\$"));
        assert_eq!("a\\\\", strip_anchors("a\\\\$"));
    }

    #[test]
    fn full_match() {
        let re = compile_full_match("fo.*").unwrap();
        assert!(re.is_match("fox"));
        assert!(!re.is_match("afox"));
        assert!(compile_full_match("(").is_err());
    }

    #[test]
    fn quoting() {
        assert_eq!("'it\\'s'", quote("it's"));
        assert_eq!("'a\\\\b'", quote("a\\b"));
    }

    #[test]
    fn sensitivity_prefixes() {
        assert_eq!(
            (Some(MatchSensitivity::Sensitive), "Fox"),
            split_sensitivity_prefix("(?-i)Fox")
        );
        assert_eq!(
            (Some(MatchSensitivity::Sensitive), "Fox"),
            split_sensitivity_prefix("(?c)Fox")
        );
        assert_eq!(
            (Some(MatchSensitivity::Insensitive), "fox"),
            split_sensitivity_prefix("(?i)fox")
        );
        assert_eq!((None, "fox"), split_sensitivity_prefix("fox"));
    }

    #[test]
    fn regex_desensitization_keeps_escapes() {
        assert_eq!(
            "caf\\W\\p{Lu}x",
            desensitize_regex("CAF\\W\\p{Lu}X", MatchSensitivity::Insensitive)
        );
        assert_eq!("Café", desensitize_regex("Café", MatchSensitivity::Sensitive));
        assert_eq!("Cafe.*", desensitize_regex("Café.*", MatchSensitivity::DiacriticsInsensitive));
    }

    #[test]
    fn alphanumeric() {
        assert!(is_alphanumeric_only("water42"));
        assert!(!is_alphanumeric_only("wat.r"));
        assert!(!is_alphanumeric_only(""));
    }
}
