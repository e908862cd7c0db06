//! Terminal presentation: status lines, spinner and push progress bar.
//!
//! Status lines go to stdout except warnings and errors, which go to stderr.
//! Spinners and bars draw on stderr and hide themselves when it is not a
//! terminal.

use std::fmt::Display;
use std::time::Duration;

use colored::Colorize;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use opsdeck_runtime::docker::PROGRESS_TOTAL;
use opsdeck_runtime::ProgressSink;

pub fn success(message: impl Display) {
    println!("{} {}", "SUCCESS".green().bold(), message);
}

pub fn info(message: impl Display) {
    println!("{} {}", "INFO".cyan().bold(), message);
}

pub fn warn(message: impl Display) {
    eprintln!("{} {}", "WARNING".yellow().bold(), message);
}

pub fn error(message: impl Display) {
    eprintln!("{} {}", "ERROR".red().bold(), message);
}

/// Start a spinner with the given message.
pub fn spinner(message: impl Into<String>) -> ProgressBar {
    let spinner = ProgressBar::new_spinner().with_message(message.into());
    spinner.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

/// Spinner plus a bounded progress bar, fed by the push stream.
pub struct PushProgress {
    _multi: MultiProgress,
    spinner: ProgressBar,
    bar: ProgressBar,
}

impl PushProgress {
    pub fn start(image: &str) -> Self {
        let multi = MultiProgress::new();
        let spinner = multi.add(spinner(format!("Pushing image {}...", image)));
        let bar = multi.add(
            ProgressBar::new(PROGRESS_TOTAL)
                .with_style(
                    ProgressStyle::with_template("{prefix} [{wide_bar}] {pos}/{len} {msg}")
                        .unwrap_or_else(|_| ProgressStyle::default_bar()),
                )
                .with_prefix("Push Progress"),
        );
        Self {
            _multi: multi,
            spinner,
            bar,
        }
    }

    pub fn finish_success(&self, message: impl Display) {
        self.bar.finish();
        self.spinner
            .finish_with_message(format!("{}", message.to_string().green()));
    }

    pub fn finish_error(&self, message: impl Display) {
        self.bar.abandon();
        self.spinner
            .abandon_with_message(format!("{}", message.to_string().red()));
    }
}

impl ProgressSink for PushProgress {
    fn status(&mut self, status: &str) {
        self.spinner.set_message(status.to_string());
    }

    fn advance(&mut self, units: u64) {
        // The bar stops at its length; the counter behind it does not.
        let position = (self.bar.position() + units).min(PROGRESS_TOTAL);
        self.bar.set_position(position);
    }

    fn detail(&mut self, status: &str, progress: &str) {
        self.bar.set_message(format!("{}: {}", status, progress));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hidden_progress() -> PushProgress {
        let bar = ProgressBar::hidden();
        bar.set_length(PROGRESS_TOTAL);
        PushProgress {
            _multi: MultiProgress::with_draw_target(indicatif::ProgressDrawTarget::hidden()),
            spinner: ProgressBar::hidden(),
            bar,
        }
    }

    #[test]
    fn test_push_progress_clamps_at_total() {
        let mut progress = hidden_progress();
        for _ in 0..9 {
            progress.advance(15);
        }
        assert_eq!(progress.bar.position(), PROGRESS_TOTAL);
    }

    #[test]
    fn test_push_progress_messages() {
        let mut progress = hidden_progress();
        progress.status("Pushed");
        progress.detail("Pushing", "[==>  ] 3MB/9MB");
        assert_eq!(progress.spinner.message(), "Pushed");
        assert_eq!(progress.bar.message(), "Pushing: [==>  ] 3MB/9MB");
    }
}
