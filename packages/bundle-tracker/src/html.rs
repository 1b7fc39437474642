//! Lossy markup removal for free-text description fields.

use regex::Regex;

/// Remove every shortest `<...>` span from `input` and trim the
/// result. Absent input returns an empty string.
///
/// Not an HTML parser: unbalanced markup may leave stray characters.
/// The non-greedy match is load-bearing, it keeps output identical on
/// malformed input where a greedy match would swallow text between
/// tags.
pub fn strip(input: Option<&str>) -> String {
    let Some(text) = input else {
        return String::new();
    };

    let tag_pattern = Regex::new("<.*?>").unwrap();
    tag_pattern.replace_all(text, "").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_simple_tags() {
        assert_eq!(strip(Some("<b>Hi</b> there")), "Hi there");
    }

    #[test]
    fn absent_input_yields_empty_string() {
        assert_eq!(strip(None), "");
    }

    #[test]
    fn trims_surrounding_whitespace() {
        assert_eq!(strip(Some("  <i>到此为止</i>  ")), "到此为止");
    }

    #[test]
    fn nested_looking_tags_are_removed_individually() {
        // shortest-match removes each bracketed span on its own
        assert_eq!(strip(Some("<<b>>x<</b>>")), ">x>");
    }

    #[test]
    fn unbalanced_markup_leaves_stray_characters() {
        assert_eq!(strip(Some("a <b unclosed")), "a <b unclosed");
        assert_eq!(strip(Some("color=<font red>text")), "color=text");
    }

    #[test]
    fn plain_text_passes_through() {
        assert_eq!(strip(Some("no markup here")), "no markup here");
        assert_eq!(strip(Some("")), "");
    }
}
