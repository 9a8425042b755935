//! Best-effort translation of Rust regex syntax into the POSIX extended
//! dialect accepted by `find -regextype posix-extended -regex`.
//!
//! Only the common shorthands are rewritten. Anything else passes through
//! unchanged, so exotic patterns may behave differently under `find` than
//! in-process.

/// Rewrite shorthand classes and Perl-only constructs.
///
/// | input       | output          |
/// |-------------|-----------------|
/// | `\d` / `\D` | `[0-9]` / `[^0-9]` |
/// | `\w` / `\W` | `[a-zA-Z0-9_]` / `[^a-zA-Z0-9_]` |
/// | `\s` / `\S` | `[[:space:]]` / `[^[:space:]]` |
/// | `\b` / `\B` | `\<` / `\>`     |
/// | `(?:`       | `(`             |
/// | `*?` `+?` `??` | greedy form  |
pub fn to_posix_extended(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() + 16);
    let mut chars = pattern.chars().peekable();
    let mut in_class = false;

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                let Some(next) = chars.next() else {
                    out.push('\\');
                    break;
                };
                out.push_str(&translate_escape(next, in_class));
            }
            '[' if !in_class => {
                in_class = true;
                out.push('[');
                // A leading `]` (after an optional `^`) is literal.
                if chars.peek() == Some(&'^') {
                    out.push('^');
                    chars.next();
                }
                if chars.peek() == Some(&']') {
                    out.push(']');
                    chars.next();
                }
            }
            ']' if in_class => {
                in_class = false;
                out.push(']');
            }
            '(' if !in_class && chars.peek() == Some(&'?') => {
                chars.next();
                // Drop the `?:` of a non-capturing group; keep anything else.
                if chars.peek() == Some(&':') {
                    chars.next();
                    out.push('(');
                } else {
                    out.push_str("(?");
                }
            }
            '*' | '+' | '?' | '}' if !in_class => {
                out.push(c);
                if chars.peek() == Some(&'?') {
                    chars.next();
                }
            }
            _ => out.push(c),
        }
    }

    out
}

fn translate_escape(c: char, in_class: bool) -> String {
    let translated = match (c, in_class) {
        ('d', false) => "[0-9]",
        ('D', false) => "[^0-9]",
        ('w', false) => "[a-zA-Z0-9_]",
        ('W', false) => "[^a-zA-Z0-9_]",
        ('s', false) => "[[:space:]]",
        ('S', false) => "[^[:space:]]",
        ('d', true) => "0-9",
        ('w', true) => "a-zA-Z0-9_",
        ('s', true) => "[:space:]",
        ('b', false) => "\\<",
        ('B', false) => "\\>",
        _ => return format!("\\{c}"),
    };
    translated.to_string()
}

/// Build a `find -regex` expression that matches a whole path when its last
/// component matches `pattern`.
///
/// `find` anchors `-regex` to the full path, so the name pattern is wrapped
/// as `.*/[^/]*(PATTERN)[^/]*`; a leading `^` or trailing `$` in the
/// pattern pins it to the start or end of the name instead.
pub fn name_regex_for_find(pattern: &str) -> String {
    let (anchored_start, body) = match pattern.strip_prefix('^') {
        Some(rest) => (true, rest),
        None => (false, pattern),
    };
    let (anchored_end, body) = match body.strip_suffix('$') {
        Some(rest) if !rest.ends_with('\\') => (true, rest),
        _ => (false, body),
    };

    format!(
        ".*/{}({}){}",
        if anchored_start { "" } else { "[^/]*" },
        to_posix_extended(body),
        if anchored_end { "" } else { "[^/]*" },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shorthand_classes() {
        assert_eq!(to_posix_extended(r"\d+"), "[0-9]+");
        assert_eq!(to_posix_extended(r"\w\s\W"), "[a-zA-Z0-9_][[:space:]][^a-zA-Z0-9_]");
        assert_eq!(to_posix_extended(r"\bword\B"), r"\<word\>");
        assert_eq!(to_posix_extended(r"\.txt"), r"\.txt");
    }

    #[test]
    fn test_inside_bracket_expression() {
        assert_eq!(to_posix_extended(r"[\d_]"), "[0-9_]");
        assert_eq!(to_posix_extended(r"[]\w]"), "[]a-zA-Z0-9_]");
        assert_eq!(to_posix_extended(r"[^\s]"), "[^[:space:]]");
    }

    #[test]
    fn test_perl_only_constructs() {
        assert_eq!(to_posix_extended(r"(?:ab)+?c"), "(ab)+c");
        assert_eq!(to_posix_extended(r"a{2,3}?"), "a{2,3}");
    }

    #[test]
    fn test_name_anchoring() {
        assert_eq!(name_regex_for_find("log"), ".*/[^/]*(log)[^/]*");
        assert_eq!(name_regex_for_find(r"^IMG_\d+"), r".*/(IMG_[0-9]+)[^/]*");
        assert_eq!(name_regex_for_find(r"\.tmp$"), r".*/[^/]*(\.tmp)");
        assert_eq!(name_regex_for_find(r"^cache$"), ".*/(cache)");
        assert_eq!(name_regex_for_find(r"a\$"), r".*/[^/]*(a\$)[^/]*");
    }
}
