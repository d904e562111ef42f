//! Pure value formatters shared by the metric variants.

const SIZE_SUFFIXES: [&str; 6] = ["B", "kB", "MB", "GB", "TB", "PB"];
const BAR_GLYPHS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Formats a duration in whole seconds using the two most significant units.
///
/// `90000` → `1d1h`, `7500` → `2h5m`, `184` → `3m4s`, `9` → `9s`.
pub fn format_duration(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds as u64
    } else {
        0
    };
    let (days, rem) = (total / 86_400, total % 86_400);
    let (hours, rem) = (rem / 3_600, rem % 3_600);
    let (mins, secs) = (rem / 60, rem % 60);

    if days > 0 {
        format!("{days}d{hours}h")
    } else if hours > 0 {
        format!("{hours}h{mins}m")
    } else if mins > 0 {
        format!("{mins}m{secs}s")
    } else {
        format!("{secs}s")
    }
}

/// Formats a byte count in powers of 1024 with no decimals (`16GB`).
///
/// The unit switches up slightly before the exact power (1023 bytes is `1kB`)
/// because the exponent is rounded to two places before truncation.
pub fn format_binary_size(size: u64) -> String {
    if size == 0 {
        return "0".to_string();
    }
    let size = size as f64;
    let exponent = ((size.log2() / 10.0) * 100.0).round() / 100.0;
    let index = (exponent as usize).min(SIZE_SUFFIXES.len() - 1);
    let scaled = size / 2f64.powi((index * 10) as i32);
    format!("{scaled:.0}{}", SIZE_SUFFIXES[index])
}

/// Picks a block glyph whose height tracks `percent` (clamped to 0..=100).
pub fn bar_glyph(percent: f64) -> char {
    let clamped = percent.clamp(0.0, 100.0);
    let index = ((clamped * BAR_GLYPHS.len() as f64) / 100.0) as usize;
    BAR_GLYPHS[index.min(BAR_GLYPHS.len() - 1)]
}
