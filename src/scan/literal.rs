//! Default-value literals and balanced delimiters.
//!
//! A literal is a double- or single-quoted string, a `{...}` object, a `[...]`
//! array, or any bare run of non-whitespace (`true`, `null`, `-1.5`, `1Gi`).
//! Spaces are only allowed inside quotes or brackets.

/// Splits a literal off the front of `src`, returning `(literal, rest)`.
pub fn take_literal(src: &str) -> Option<(&str, &str)> {
    let first = src.chars().next()?;
    let end = match first {
        '"' | '\'' => src[1..].find(first)? + 2,
        '{' | '[' => balanced_end(src)?,
        c if c.is_whitespace() => return None,
        _ => src.find(char::is_whitespace).unwrap_or(src.len()),
    };
    Some(src.split_at(end))
}

/// Content between a leading `{` and its matching `}`, plus what follows.
pub fn take_braced(src: &str) -> Option<(&str, &str)> {
    if !src.starts_with('{') {
        return None;
    }
    let end = balanced_end(src)?;
    Some((&src[1..end - 1], &src[end..]))
}

/// Byte offset just past the bracket that closes `src`'s first character.
/// Quoted runs are skipped, so `{"a}": 1}` closes at the last brace.
fn balanced_end(src: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for (i, c) in src.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '"' => quote = Some(c),
            '{' | '[' => depth += 1,
            '}' | ']' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i + c.len_utf8());
                }
            }
            _ => {}
        }
    }
    None
}

/// Removes one pair of matching surrounding quotes.
pub fn unquote(text: &str) -> &str {
    let text = text.trim();
    for q in ['"', '\''] {
        if text.len() >= 2 && text.starts_with(q) && text.ends_with(q) {
            return &text[1..text.len() - 1];
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quoted_strings_keep_spaces() {
        assert_eq!(take_literal(r#""hello world" - d"#), Some((r#""hello world""#, " - d")));
        assert_eq!(take_literal("'single quoted'"), Some(("'single quoted'", "")));
    }

    #[test]
    fn brackets_are_balanced() {
        assert_eq!(
            take_literal(r#"{"a": {"b": [1, 2]}} - nested"#),
            Some((r#"{"a": {"b": [1, 2]}}"#, " - nested"))
        );
        assert_eq!(take_literal("[80, 443]"), Some(("[80, 443]", "")));
        assert_eq!(take_literal(r#"{"x}": 1}"#), Some((r#"{"x}": 1}"#, "")));
        assert_eq!(take_literal("[1, 2"), None);
    }

    #[test]
    fn bare_tokens_stop_at_whitespace() {
        assert_eq!(take_literal("-1.5 rest"), Some(("-1.5", " rest")));
        assert_eq!(take_literal("null"), Some(("null", "")));
        assert_eq!(take_literal(" 5"), None);
    }

    #[test]
    fn braced_type_blocks() {
        assert_eq!(
            take_braced(r#"{[]gpu default=[{"name":"x"}]} desc"#),
            Some((r#"[]gpu default=[{"name":"x"}]"#, " desc"))
        );
        assert_eq!(take_braced("string}"), None);
    }

    #[test]
    fn unquote_strips_one_pair() {
        assert_eq!(unquote(r#""5d""#), "5d");
        assert_eq!(unquote("'x'"), "x");
        assert_eq!(unquote(r#""mixed'"#), r#""mixed'"#);
        assert_eq!(unquote("plain"), "plain");
    }
}
