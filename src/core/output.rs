//! Terminal rendering of error lines.

/// Fold a store diagnostic onto one line of at most `max_chars` characters.
/// SQLite messages can span lines; the prompt layout cannot.
pub fn compact_line(input: &str, max_chars: usize) -> String {
    let collapsed = input.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut chars = collapsed.chars();
    let preview: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{}...", preview)
    } else {
        preview
    }
}
