//! Values documents as presented to (and read back from) an editor

use crate::error::Result;
use crate::values::Values;

/// Serialize values to the YAML text shown to the user
///
/// Object keys come out sorted, so rendering the same values twice always
/// yields the same bytes.
pub fn render(values: &Values) -> Result<String> {
    Ok(serde_yaml::to_string(values)?)
}

/// Parse an edited document
///
/// Malformed YAML is reported as an error and never auto-corrected.
pub fn parse(content: &str) -> Result<Values> {
    Values::from_yaml(content)
}

/// Whether the edited text differs from the text that was presented
///
/// This is a byte comparison, not a structural one: reformatting or adding
/// a comment counts as a change.
pub fn has_changed(before: &str, after: &str) -> bool {
    before.as_bytes() != after.as_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_render_sorts_keys() {
        let values = Values(json!({"zeta": 1, "alpha": {"b": 2, "a": 1}}));
        let yaml = render(&values).unwrap();

        assert_eq!(yaml, "alpha:\n  a: 1\n  b: 2\nzeta: 1\n");
    }

    #[test]
    fn test_render_is_deterministic() {
        let values = Values(json!({"image": {"tag": "1.0", "repository": "nginx"}, "replicas": 3}));
        assert_eq!(render(&values).unwrap(), render(&values.clone()).unwrap());
    }

    #[test]
    fn test_render_then_parse_is_identity() {
        let values = Values(json!({"a": 1, "b": {"c": [1, "two", null, false]}}));
        let parsed = parse(&render(&values).unwrap()).unwrap();
        assert_eq!(parsed, values);
    }

    #[test]
    fn test_parse_malformed_is_error() {
        let err = parse("image:\n  tag: [unclosed\n").unwrap_err();
        assert!(matches!(err, crate::CoreError::YamlParse(_)));
    }

    #[test]
    fn test_parse_empty_is_empty_values() {
        assert_eq!(parse("").unwrap(), Values::new());
    }

    #[test]
    fn test_has_changed_identical() {
        let text = "a: 1\nb:\n  c: 2\n";
        assert!(!has_changed(text, text));
        assert!(!has_changed("", ""));
    }

    #[test]
    fn test_has_changed_value_edit() {
        assert!(has_changed("a: 1\n", "a: 2\n"));
    }

    #[test]
    fn test_has_changed_whitespace_and_comments_count() {
        assert!(has_changed("a: 1\n", "a: 1\n\n"));
        assert!(has_changed("a: 1\n", "a:  1\n"));
        assert!(has_changed("a: 1\n", "# note\na: 1\n"));
    }

    #[test]
    fn test_has_changed_key_order_counts() {
        // structurally the same document
        let before = "a: 1\nb: 2\n";
        let after = "b: 2\na: 1\n";
        assert_eq!(parse(before).unwrap(), parse(after).unwrap());
        assert!(has_changed(before, after));
    }
}
