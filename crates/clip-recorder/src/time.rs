//! Elapsed-time display

/// Format milliseconds as `MM:SS`; minutes keep growing past 59
pub fn format_elapsed(elapsed_ms: u64) -> String {
    let seconds = elapsed_ms / 1000;
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}
