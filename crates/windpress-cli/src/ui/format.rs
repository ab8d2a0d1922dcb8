//! Formatting utilities for sizes, durations and build summaries.

use owo_colors::OwoColorize;
use std::time::Duration;

/// Format a byte count with the most fitting unit.
///
/// ```
/// use windpress_cli::ui::format_size;
///
/// assert_eq!(format_size(0), "0 B");
/// assert_eq!(format_size(500), "500 B");
/// assert_eq!(format_size(1024), "1.00 KB");
/// assert_eq!(format_size(1_048_576), "1.00 MB");
/// ```
pub fn format_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB"];

    if bytes == 0 {
        return "0 B".to_string();
    }

    let mut size = bytes as f64;
    let mut unit_idx = 0;

    while size >= 1024.0 && unit_idx < UNITS.len() - 1 {
        size /= 1024.0;
        unit_idx += 1;
    }

    if unit_idx == 0 {
        format!("{} {}", size as u64, UNITS[unit_idx])
    } else {
        format!("{:.2} {}", size, UNITS[unit_idx])
    }
}

/// Format a duration as `ms`, seconds or `Xm Ys`.
///
/// ```
/// use std::time::Duration;
/// use windpress_cli::ui::format_duration;
///
/// assert_eq!(format_duration(Duration::from_millis(50)), "50ms");
/// assert_eq!(format_duration(Duration::from_millis(1500)), "1.50s");
/// assert_eq!(format_duration(Duration::from_secs(90)), "1m 30s");
/// ```
pub fn format_duration(duration: Duration) -> String {
    let total_ms = duration.as_millis();

    if total_ms < 1000 {
        format!("{}ms", total_ms)
    } else if total_ms < 60_000 {
        format!("{:.2}s", duration.as_secs_f64())
    } else {
        let secs = duration.as_secs();
        format!("{}m {}s", secs / 60, secs % 60)
    }
}

/// One line of the build summary.
pub struct SummaryRow<'a> {
    pub label: &'a str,
    pub bytes: u64,
}

/// Print the sizes of the generated stylesheets and the total duration.
pub fn print_build_summary(rows: &[SummaryRow<'_>], candidates: usize, duration: Duration) {
    let width = rows.iter().map(|row| row.label.len()).max().unwrap_or(0);

    eprintln!();
    for row in rows {
        eprintln!(
            "  {:<width$}  {}",
            row.label.cyan(),
            format_size(row.bytes).bold(),
            width = width
        );
    }
    if candidates > 0 {
        eprintln!("  {:<width$}  {}", "candidates".cyan(), candidates, width = width);
    }
    eprintln!();
    eprintln!("  {} {}", "Finished in".dimmed(), format_duration(duration).bold());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size_units() {
        assert_eq!(format_size(1023), "1023 B");
        assert_eq!(format_size(1536), "1.50 KB");
        assert_eq!(format_size(5 * 1024 * 1024 * 1024), "5.00 GB");
    }

    #[test]
    fn test_format_duration_boundaries() {
        assert_eq!(format_duration(Duration::from_millis(999)), "999ms");
        assert_eq!(format_duration(Duration::from_millis(1000)), "1.00s");
        assert_eq!(format_duration(Duration::from_secs(60)), "1m 0s");
    }
}
