//! Status message functions for terminal output.

use owo_colors::OwoColorize;
use windpress_bus::{LogEvent, LogKind};

/// Print a success message to stderr.
///
/// ```no_run
/// use windpress_cli::ui::success;
///
/// success("Cache generated");
/// ```
pub fn success(message: &str) {
    eprintln!("{} {}", "✓".green().bold(), message);
}

/// Print an info message to stderr.
pub fn info(message: &str) {
    eprintln!("{} {}", "ℹ".blue().bold(), message);
}

/// Print a warning message to stderr.
pub fn warning(message: &str) {
    eprintln!("{} {}", "⚠".yellow().bold(), message.yellow());
}

/// Print an error message to stderr.
pub fn error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message.red());
}

/// Print a debug message to stderr when `RUST_LOG` is set.
pub fn debug(message: &str) {
    if std::env::var_os("RUST_LOG").is_some() {
        eprintln!("{} {}", "◆".dimmed(), message.dimmed());
    }
}

/// Print a build log event with the symbol of its kind.
pub fn log_event(event: &LogEvent) {
    match event.kind {
        LogKind::Info => info(&event.message),
        LogKind::Success => success(&event.message),
        LogKind::Warning => warning(&event.message),
        LogKind::Error => error(&event.message),
    }
}
