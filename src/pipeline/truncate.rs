//! Context budgeting: fit an unbounded transcript into the model's window.
//!
//! The policy keeps the head of the document and drops the tail. Statement
//! headers (issuer, account, period, balances) come first, so a prefix is
//! the most useful thing to keep. Lines are never reordered or split.

/// Marker line appended at the cut point when a transcript is truncated.
pub const TRUNCATION_MARKER: &str = "[... document truncated for context limit ...]";

/// Bound `text` to at most `max_chars` characters.
///
/// Text that already fits is returned unchanged. Otherwise whole lines are
/// kept while the running count (each line plus one separator) stays
/// within the budget, and [`TRUNCATION_MARKER`] is appended on its own line
/// in place of the first line that would overflow.
///
/// Trailing lines are given back until the marker fits too; with a budget
/// smaller than the marker itself the output is empty. The output is never
/// longer than `max_chars`. Lengths are counted in characters, not bytes.
///
/// The marker is charged against the budget rather than appended past it,
/// so fewer lines survive than would fit on their own: ten 20-character
/// lines with a budget of 100 keep two lines (88 characters with the
/// marker), not the four that fit before the marker is added.
pub fn truncate_for_context(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }

    let marker_len = TRUNCATION_MARKER.chars().count();
    let mut kept: Vec<&str> = Vec::new();
    let mut used = 0usize;

    for line in text.split('\n') {
        let cost = line.chars().count() + 1;
        if used + cost > max_chars {
            break;
        }
        kept.push(line);
        used += cost;
    }

    // Give back whole lines until the marker fits after the kept prefix.
    // Joined length is `used - 1` (no trailing separator); the marker adds
    // one separator plus its own length.
    while !kept.is_empty() && used - 1 + 1 + marker_len > max_chars {
        if let Some(dropped) = kept.pop() {
            used -= dropped.chars().count() + 1;
        }
    }

    if kept.is_empty() {
        return if marker_len <= max_chars {
            TRUNCATION_MARKER.to_string()
        } else {
            String::new()
        };
    }

    let mut out = kept.join("\n");
    out.push('\n');
    out.push_str(TRUNCATION_MARKER);
    out
}
