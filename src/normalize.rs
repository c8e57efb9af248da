//! Text normalization shared by the reference resolver and the tiered matcher.

/// Collapse every run of whitespace into a single space and trim the ends.
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Whitespace-collapsed and case-folded form used for table lookups.
pub fn normalize_key(s: &str) -> String {
    collapse_whitespace(s).to_lowercase()
}

/// Split normalized input into a case-folded head and the verbatim tail tokens.
pub fn split_head(s: &str) -> Option<(String, Vec<String>)> {
    let mut parts = s.split_whitespace();
    let head = parts.next()?.to_lowercase();
    Some((head, parts.map(str::to_string).collect()))
}

/// Join a base template with argument tokens, trimming the result.
///
/// An empty template yields just the arguments.
pub fn join_args(base: &str, args: &[String]) -> String {
    format!("{} {}", base, args.join(" ")).trim().to_string()
}

/// Quote a path-like token for a shell command line if it contains spaces.
pub fn quote_if_needed(token: &str) -> String {
    if token.chars().any(char::is_whitespace) && !token.starts_with('"') {
        format!("\"{}\"", token)
    } else {
        token.to_string()
    }
}
