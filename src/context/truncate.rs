//! Line-budget truncation of error output.

/// Default line budget for error text.
pub const DEFAULT_MAX_LINES: usize = 50;

/// Lines kept from each end when truncating.
const KEEP_LINES: usize = 20;

/// Bound `error` to `max_lines` lines, keeping its head and tail.
///
/// Text within the budget is returned unchanged. Longer text keeps the first
/// and last 20 lines (fewer when the budget is under 40) around a marker
/// with the number of omitted lines.
pub fn truncate_error(error: &str, max_lines: usize) -> String {
    let lines: Vec<&str> = error.split('\n').collect();
    if lines.len() <= max_lines {
        return error.to_string();
    }

    let keep = KEEP_LINES.min(max_lines / 2);
    let head = lines[..keep].join("\n");
    let tail = lines[lines.len() - keep..].join("\n");
    let omitted = lines.len() - 2 * keep;

    format!("{head}\n\n... [{omitted} lines omitted] ...\n\n{tail}")
}
