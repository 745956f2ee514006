//! Smarty language tables.
//!
//! Static data about the Smarty template language shared by the scanner and
//! by editor features layered on top of it (completion, signature help).

/// Built-in Smarty functions.
pub const BUILTIN_FUNCTIONS: &[&str] = &[
    "assign",
    "capture",
    "counter",
    "foreach",
    "foreachelse",
    "if",
    "elseif",
    "else",
    "include",
    "include_php",
    "insert",
    "ldelim",
    "rdelim",
    "literal",
    "php",
    "section",
    "sectionelse",
    "strip",
];

/// Common variable modifiers.
pub const MODIFIERS: &[&str] = &[
    "capitalize",
    "cat",
    "constant",
    "count_characters",
    "count_paragraphs",
    "count_sentences",
    "count_words",
    "date_format",
    "default",
    "escape",
    "htmlspecialchars",
    "indent",
    "json_decode",
    "json_encode",
    "lower",
    "nl2br",
    "number_format",
    "print_r",
    "regex_replace",
    "replace",
    "spacify",
    "string_format",
    "strip",
    "strip_tags",
    "truncate",
    "upper",
    "urldecode",
    "urlencode",
    "var_dump",
    "wordwrap",
];

/// Tag names that close themselves logically: their block ends at their own
/// start tag, and they never participate in open/close nesting.
const SELF_CLOSING: &[&str] = &[
    "assign",
    "counter",
    "foreachelse",
    "elseif",
    "else",
    "include",
    "include_php",
    "insert",
    "ldelim",
    "rdelim",
    "sectionelse",
];

/// Whether `name` is a logically self-closing tag.
pub fn is_self_closing(name: &str) -> bool {
    SELF_CLOSING.contains(&name)
}

/// Whether `name` is a built-in Smarty function.
pub fn is_builtin_function(name: &str) -> bool {
    BUILTIN_FUNCTIONS.contains(&name)
}

/// Known attributes for a built-in function, if any.
pub fn function_attributes(name: &str) -> Option<&'static [&'static str]> {
    let attrs: &'static [&'static str] = match name {
        "assign" => &["var", "value"],
        "capture" => &["name", "assign"],
        "counter" => &["name", "start", "skip", "direction", "print", "assign"],
        "foreach" => &["name", "from", "key", "item"],
        "include" => &["file", "assign"],
        "section" => &["name", "loop", "start", "step", "max", "show"],
        _ => return None,
    };
    Some(attrs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_self_closing_set() {
        assert!(is_self_closing("include"));
        assert!(is_self_closing("else"));
        assert!(!is_self_closing("foreach"));
        assert!(!is_self_closing("literal"));
        // Membership is exact, not substring-based
        assert!(!is_self_closing("includes"));
        assert!(!is_self_closing("xcounter"));
    }

    #[test]
    fn test_function_attributes() {
        assert_eq!(
            function_attributes("foreach"),
            Some(&["name", "from", "key", "item"][..])
        );
        assert_eq!(function_attributes("if"), None);
        assert!(is_builtin_function("if"));
        assert!(!is_builtin_function("my_plugin"));
    }
}
