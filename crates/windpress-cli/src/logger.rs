//! Logging setup for the WindPress CLI.
//!
//! Diagnostics go through `tracing` to stderr. Build log events that the
//! cache builder posts on the bus are mirrored into `tracing` under the
//! `windpress::build` target; the default filter turns that target off
//! because the build command already prints those events through [`crate::ui`].
//!
//! # Example
//!
//! ```rust,no_run
//! use windpress_cli::logger::init_logger;
//!
//! init_logger(false, false, false);
//! tracing::info!("starting build");
//! ```

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used with `--verbose`.
pub const VERBOSE_FILTER: &str = "windpress=debug";

/// Filter used with `--quiet`.
pub const QUIET_FILTER: &str = "windpress=error,windpress::build=off";

/// Filter used when neither flag nor `RUST_LOG` is set.
pub const DEFAULT_FILTER: &str = "windpress=info,windpress::build=off";

/// Initialize the tracing subscriber.
///
/// The level is picked in this order:
/// 1. `--verbose`: debug for every windpress crate, bus events included
/// 2. `--quiet`: errors only
/// 3. `RUST_LOG`
/// 4. [`DEFAULT_FILTER`]
pub fn init_logger(verbose: bool, quiet: bool, no_color: bool) {
    let filter = if verbose {
        EnvFilter::new(VERBOSE_FILTER)
    } else if quiet {
        EnvFilter::new(QUIET_FILTER)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
    };

    init_logger_with_filter(filter, no_color);
}

/// Initialize the logger with a custom filter.
pub fn init_logger_with_filter(filter: EnvFilter, no_color: bool) {
    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_level(true)
        .with_ansi(!no_color)
        .with_writer(std::io::stderr)
        .compact();

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}

/// Whether stderr output should be colored.
///
/// `NO_COLOR` wins over `FORCE_COLOR`; otherwise the terminal decides.
pub fn should_use_colors() -> bool {
    if std::env::var_os("NO_COLOR").is_some() {
        return false;
    }
    if std::env::var_os("FORCE_COLOR").is_some() {
        return true;
    }
    console::Term::stderr().features().colors_supported()
}
