//! Spinner for long-running external operations.
//!
//! Purely cosmetic. Set `MACBUNDLER_NO_PROGRESS` to hide it, e.g. in CI logs.

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

fn is_progress_disabled() -> bool {
    std::env::var("MACBUNDLER_NO_PROGRESS").is_ok()
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .template("{spinner:.cyan} {msg} ({elapsed})")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "✓"])
}

/// Animated spinner that clears itself when dropped.
pub struct Spinner {
    bar: ProgressBar,
}

impl Spinner {
    pub fn start(message: impl Into<String>) -> Self {
        let bar = if is_progress_disabled() {
            ProgressBar::hidden()
        } else {
            let bar = ProgressBar::new_spinner();
            bar.set_style(spinner_style());
            bar.enable_steady_tick(Duration::from_millis(100));
            bar
        };
        bar.set_message(message.into());
        Self { bar }
    }

    pub fn finish(self, message: impl Into<String>) {
        self.bar.finish_with_message(message.into());
    }
}

impl Drop for Spinner {
    fn drop(&mut self) {
        if !self.bar.is_finished() {
            self.bar.finish_and_clear();
        }
    }
}
