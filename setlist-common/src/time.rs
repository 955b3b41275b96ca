//! Time-code helpers for tracklist positions

/// Format seconds as a tracklist time code
///
/// `M:SS` below one hour, `H:MM:SS` from one hour on.
///
/// ```
/// use setlist_common::time::format_timestamp;
///
/// assert_eq!(format_timestamp(65), "1:05");
/// assert_eq!(format_timestamp(3930), "1:05:30");
/// ```
pub fn format_timestamp(seconds: u32) -> String {
    let hours = seconds / 3600;
    let mins = (seconds % 3600) / 60;
    let secs = seconds % 60;
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, mins, secs)
    } else {
        format!("{}:{:02}", mins, secs)
    }
}

/// Parse `H:MM:SS` or `M:SS` into seconds
///
/// Returns `None` for anything else, including out-of-range minute or
/// second fields and totals that do not fit in `u32`.
pub fn parse_timestamp(text: &str) -> Option<u32> {
    let parts: Vec<&str> = text.trim().split(':').collect();
    let numbers: Option<Vec<u32>> = parts
        .iter()
        .map(|p| {
            if p.is_empty() || !p.chars().all(|c| c.is_ascii_digit()) {
                None
            } else {
                p.parse::<u32>().ok()
            }
        })
        .collect();
    let numbers = numbers?;

    match numbers.as_slice() {
        [h, m, s] if *m < 60 && *s < 60 => h.checked_mul(3600)?.checked_add(m * 60 + s),
        [m, s] if *s < 60 => m.checked_mul(60)?.checked_add(*s),
        _ => None,
    }
}
