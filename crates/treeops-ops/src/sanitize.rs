//! Portable file-name normalization.

/// Name used when nothing usable survives sanitizing.
pub const PLACEHOLDER_NAME: &str = "unnamed";

/// Longest name produced, in characters.
pub const MAX_NAME_LEN: usize = 255;

/// Windows device names, matched case-insensitively on the part before the
/// first dot.
pub const RESERVED_NAMES: [&str; 22] = [
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

const WINDOWS_FORBIDDEN: [char; 9] = ['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Make `name` safe to use on any common filesystem.
///
/// Characters outside the allow-list and the Windows-forbidden characters
/// become `_`, runs of `_` collapse, an empty result becomes
/// [`PLACEHOLDER_NAME`], the name is capped at [`MAX_NAME_LEN`] characters
/// with its extension kept, and reserved device names get a `_` prefix.
/// Applying it twice gives the same result as applying it once.
///
/// ```
/// use treeops_ops::sanitize;
///
/// assert_eq!(sanitize("a:b*c"), "a_b_c");
/// assert_eq!(sanitize("CON"), "_CON");
/// assert_eq!(sanitize("файл.txt"), "_.txt");
/// ```
pub fn sanitize(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        let c = if is_allowed(c) { c } else { '_' };
        if c == '_' && out.ends_with('_') {
            continue;
        }
        out.push(c);
    }

    if out.is_empty() {
        out.push_str(PLACEHOLDER_NAME);
    }

    let mut out = truncate_keeping_extension(&out, MAX_NAME_LEN);
    if is_reserved(&out) {
        out.insert(0, '_');
        out = truncate_keeping_extension(&out, MAX_NAME_LEN);
    }
    out
}

/// Whether a character survives sanitizing unchanged.
pub fn is_allowed(c: char) -> bool {
    if WINDOWS_FORBIDDEN.contains(&c) {
        return false;
    }
    matches!(c,
        ' '..='~'
        | '\u{3000}'..='\u{303F}' // CJK symbols and punctuation
        | '\u{3040}'..='\u{309F}' // Hiragana
        | '\u{30A0}'..='\u{30FF}' // Katakana
        | '\u{3400}'..='\u{4DBF}' // CJK extension A
        | '\u{4E00}'..='\u{9FFF}' // CJK unified ideographs
        | '\u{F900}'..='\u{FAFF}' // CJK compatibility ideographs
        | '\u{FF00}'..='\u{FFEF}' // half/full-width forms
    )
}

/// Whether the part of `name` before its first dot is a device name.
pub fn is_reserved(name: &str) -> bool {
    let base = name.split('.').next().unwrap_or("");
    RESERVED_NAMES
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(base))
}

/// Split `name` into stem and extension at the last dot. Dotfiles such as
/// `.bashrc` have no extension.
pub fn split_extension(name: &str) -> (&str, Option<&str>) {
    match name.rfind('.') {
        Some(idx) if idx > 0 => (&name[..idx], Some(&name[idx + 1..])),
        _ => (name, None),
    }
}

fn truncate_keeping_extension(name: &str, max: usize) -> String {
    if name.chars().count() <= max {
        return name.to_string();
    }

    match split_extension(name) {
        (stem, Some(ext)) if ext.chars().count() + 2 <= max => {
            let keep = max - ext.chars().count() - 1;
            let stem: String = stem.chars().take(keep).collect();
            format!("{stem}.{ext}")
        }
        _ => name.chars().take(max).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forbidden_characters() {
        assert_eq!(sanitize("a:b*c"), "a_b_c");
        assert_eq!(sanitize("what?<now>|.txt"), "what_now_.txt");
        assert_eq!(sanitize(r#"q"u\o/te"#), "q_u_o_te");
    }

    #[test]
    fn test_runs_collapse() {
        assert_eq!(sanitize("a___b"), "a_b");
        assert_eq!(sanitize("a:*?b"), "a_b");
        assert_eq!(sanitize("\u{0}\u{1}x"), "_x");
    }

    #[test]
    fn test_allow_list() {
        assert_eq!(sanitize("plain name (1).txt"), "plain name (1).txt");
        assert_eq!(sanitize("日本語のファイル.txt"), "日本語のファイル.txt");
        assert_eq!(sanitize("ｆｕｌｌ"), "ｆｕｌｌ");
        assert_eq!(sanitize("café"), "caf_");
        assert_eq!(sanitize("emoji🎉.png"), "emoji_.png");
    }

    #[test]
    fn test_placeholder() {
        assert_eq!(sanitize(""), PLACEHOLDER_NAME);
    }

    #[test]
    fn test_reserved_names() {
        assert_eq!(sanitize("CON"), "_CON");
        assert_eq!(sanitize("con.txt"), "_con.txt");
        assert_eq!(sanitize("LPT9.tar.gz"), "_LPT9.tar.gz");
        assert_eq!(sanitize("CONSOLE"), "CONSOLE");
        assert_eq!(sanitize("COM10"), "COM10");
    }

    #[test]
    fn test_truncation_keeps_extension() {
        let long = format!("{}.pdf", "x".repeat(400));
        let out = sanitize(&long);
        assert_eq!(out.chars().count(), MAX_NAME_LEN);
        assert!(out.ends_with(".pdf"));

        let multibyte = "漢".repeat(300);
        assert_eq!(sanitize(&multibyte).chars().count(), MAX_NAME_LEN);
    }

    #[test]
    fn test_idempotent() {
        let samples = [
            "a:b*c",
            "CON",
            "файл.txt",
            "__weird__name__",
            "",
            "nul.tar.gz",
            "日本:語",
            "trailing.",
            ".hidden",
        ];
        for sample in samples {
            let once = sanitize(sample);
            assert_eq!(sanitize(&once), once, "not idempotent for {sample:?}");
        }

        let long = format!("{}.{}", "s".repeat(10), "e".repeat(251));
        let once = sanitize(&long);
        assert_eq!(sanitize(&once), once);
    }

    #[test]
    fn test_split_extension() {
        assert_eq!(split_extension("a.txt"), ("a", Some("txt")));
        assert_eq!(split_extension("a.tar.gz"), ("a.tar", Some("gz")));
        assert_eq!(split_extension(".bashrc"), (".bashrc", None));
        assert_eq!(split_extension("noext"), ("noext", None));
    }
}
