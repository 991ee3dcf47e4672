//! Progress bars shared by CLI commands.

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::time::Duration;

const BAR_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] {prefix:>10} [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}";

/// A counted bar in the style used across commands.
pub fn counter_bar(len: u64, prefix: &str) -> ProgressBar {
    let pb = ProgressBar::new(len);
    let style = ProgressStyle::with_template(BAR_TEMPLATE)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▓▒░  ")
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏");
    pb.set_style(style);
    pb.set_prefix(prefix.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Bars for the two phases of a run: caching column-days, then writing days.
pub struct RunProgress {
    _multi: MultiProgress,
    pub cached: ProgressBar,
    pub written: ProgressBar,
}

impl RunProgress {
    pub fn new(num_columns: usize, num_days: usize) -> Self {
        let multi = MultiProgress::new();
        let cached = multi.add(counter_bar((num_columns * num_days) as u64, "cached"));
        let written = multi.add(counter_bar(num_days as u64, "written"));
        Self {
            _multi: multi,
            cached,
            written,
        }
    }

    pub fn finish(&self) {
        self.cached.finish_with_message("done");
        self.written.finish_with_message("done");
    }

    pub fn abandon(&self) {
        self.cached.abandon_with_message("failed");
        self.written.abandon();
    }
}
