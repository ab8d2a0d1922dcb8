//! Spinner for work without a known duration.

use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use std::time::Duration;

/// Spinner on stderr.
///
/// Hidden when stderr is not a terminal or when running in CI, so piped
/// output only carries the status lines.
///
/// ```no_run
/// use windpress_cli::ui::Spinner;
///
/// let spinner = Spinner::new("Compiling Tailwind CSS...");
/// spinner.finish("Compiled");
/// ```
pub struct Spinner {
    pb: ProgressBar,
}

impl Spinner {
    /// Create and start a new spinner.
    pub fn new(message: &str) -> Self {
        let pb = if super::is_ci() || !console::user_attended_stderr() {
            ProgressBar::hidden()
        } else {
            ProgressBar::new_spinner()
        };
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .expect("valid template")
                .tick_strings(&["◐", "◓", "◑", "◒"]),
        );
        pb.set_message(message.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));

        Self { pb }
    }

    /// Update the message while the spinner runs.
    pub fn set_message(&self, message: &str) {
        self.pb.set_message(message.to_string());
    }

    /// Run `f` with the spinner cleared, so lines printed by `f` don't
    /// interleave with it.
    pub fn suspend<F: FnOnce() -> R, R>(&self, f: F) -> R {
        self.pb.suspend(f)
    }

    /// Finish with a green checkmark.
    pub fn finish(&self, message: &str) {
        self.pb.finish_with_message(format!("{} {}", "✓".green(), message));
    }

    /// Finish with a red cross.
    pub fn fail(&self, message: &str) {
        self.pb.finish_with_message(format!("{} {}", "✗".red(), message));
    }

    /// Remove the spinner without a final message.
    pub fn clear(&self) {
        self.pb.finish_and_clear();
    }
}
