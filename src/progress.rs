//! Progress bar for apply runs

use crate::ui;
use colored::Colorize;
use declarative::{ApplyResult, ProgressCallback};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// Symbol shown next to a finished pass
pub fn result_symbol(result: &ApplyResult) -> &'static str {
    match result {
        ApplyResult::NoChange => "○",
        ApplyResult::Created | ApplyResult::Modified | ApplyResult::Removed => "✓",
        ApplyResult::Failed { .. } => "✗",
        ApplyResult::Skipped { .. } => "⊘",
    }
}

/// One bar across all passes of a run
pub struct ApplyProgress {
    pb: Option<ProgressBar>,
    hidden: bool,
}

impl ApplyProgress {
    pub fn new(hidden: bool) -> Self {
        Self { pb: None, hidden }
    }

    fn bar(len: u64, hidden: bool) -> ProgressBar {
        let pb = ProgressBar::new(len);
        if hidden {
            pb.set_draw_target(ProgressDrawTarget::hidden());
        }
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );
        pb
    }
}

impl ProgressCallback for ApplyProgress {
    fn on_start(&mut self, count: usize) {
        self.pb = Some(Self::bar(count as u64, self.hidden));
    }

    fn on_resource_start(&mut self, id: &str, _description: &str) {
        if let Some(pb) = &self.pb {
            pb.set_message(ui::truncate_id(id, 50));
        }
    }

    fn on_resource_complete(&mut self, id: &str, result: &ApplyResult) {
        let Some(pb) = &self.pb else {
            return;
        };
        if let ApplyResult::Failed { error, .. } = result {
            let first = error.lines().next().unwrap_or_default();
            pb.suspend(|| println!("  {} {} ({})", "✗".red(), id, first));
        }
        pb.set_message(format!("{} {}", result_symbol(result), ui::truncate_id(id, 50)));
        pb.inc(1);
    }

    fn on_complete(&mut self) {
        if let Some(pb) = self.pb.take() {
            pb.finish_and_clear();
        }
    }
}
