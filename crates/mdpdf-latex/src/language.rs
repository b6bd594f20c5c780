//! Fence tag to `listings` language mapping.

/// `listings` language for a fence tag.
///
/// Returns `None` for unrecognized tags and for plain text, which are
/// typeset in the generic style without a `language` option. `JavaScript`,
/// JSON, YAML, Go and Rust are defined by the preamble; the rest ship with
/// `listings`.
#[must_use]
pub fn listings_language(tag: &str) -> Option<&'static str> {
    let language = match tag.to_ascii_lowercase().as_str() {
        "python" | "py" => "Python",
        "java" => "Java",
        "c" => "C",
        "cpp" | "c++" | "cxx" => "C++",
        "javascript" | "js" => "JavaScript",
        "bash" | "sh" | "shell" => "bash",
        "html" => "HTML",
        "xml" => "XML",
        "sql" => "SQL",
        "json" => "JSON",
        "yaml" | "yml" => "YAML",
        "go" | "golang" => "Go",
        "ruby" | "rb" => "Ruby",
        "perl" => "Perl",
        "rust" | "rs" => "Rust",
        _ => return None,
    };
    Some(language)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stock_languages() {
        assert_eq!(listings_language("python"), Some("Python"));
        assert_eq!(listings_language("cpp"), Some("C++"));
        assert_eq!(listings_language("sh"), Some("bash"));
    }

    #[test]
    fn test_preamble_languages() {
        assert_eq!(listings_language("yaml"), Some("YAML"));
        assert_eq!(listings_language("Rust"), Some("Rust"));
    }

    #[test]
    fn test_text_and_unknown_fall_back() {
        assert_eq!(listings_language("text"), None);
        assert_eq!(listings_language("brainfuck"), None);
        assert_eq!(listings_language(""), None);
    }
}
