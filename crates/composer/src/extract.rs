//! JSON recovery from model output.

/// The outermost `{ ... }` span of a text, if any.
///
/// Models sometimes wrap their JSON in prose; the widest brace span is the
/// best candidate for the object itself.
pub(crate) fn outermost_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&text[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_object_passes_through() {
        assert_eq!(outermost_object(r#"{"a": 1}"#), Some(r#"{"a": 1}"#));
    }

    #[test]
    fn test_prose_is_stripped() {
        let text = "Here is your composition:\n{\"title\": \"X\"}\nEnjoy!";
        assert_eq!(outermost_object(text), Some("{\"title\": \"X\"}"));
    }

    #[test]
    fn test_span_is_greedy_across_nested_braces() {
        let text = "a {\"outer\": {\"inner\": 1}} b";
        assert_eq!(outermost_object(text), Some("{\"outer\": {\"inner\": 1}}"));
    }

    #[test]
    fn test_no_object_found() {
        assert_eq!(outermost_object("no json here"), None);
        assert_eq!(outermost_object("} backwards {"), None);
        assert_eq!(outermost_object(""), None);
    }
}
