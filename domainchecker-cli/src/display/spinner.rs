use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Spinner shown on stderr while a single domain is checked. Cleared on drop.
pub struct Spinner {
    progress: ProgressBar,
}

impl Spinner {
    pub fn new(message: impl Into<String>) -> Self {
        let progress = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner()
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
            .template("{spinner:.cyan} {msg}")
        {
            progress.set_style(style);
        }
        progress.set_message(message.into());
        progress.enable_steady_tick(Duration::from_millis(80));

        Self { progress }
    }
}

impl Drop for Spinner {
    fn drop(&mut self) {
        self.progress.finish_and_clear();
    }
}
