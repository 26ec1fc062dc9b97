const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];

/// Format a byte count as a short human-readable size, e.g. `1.5 KB`.
///
/// Uses 1024 as the step and at most `decimals` fractional digits with
/// trailing zeros trimmed. Sizes beyond the GB range stay in GB.
pub fn format_bytes(bytes: u64, decimals: usize) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let fixed = format!("{value:.decimals$}");
    let trimmed = if fixed.contains('.') {
        fixed.trim_end_matches('0').trim_end_matches('.')
    } else {
        fixed.as_str()
    };
    format!("{} {}", trimmed, UNITS[unit])
}
