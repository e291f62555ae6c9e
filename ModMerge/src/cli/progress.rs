//! CLI progress display utilities
//!
//! Step indicators with emojis, plus a progress bar for batch runs.

use std::time::Duration;

use console::{Emoji, style};
use indicatif::{HumanDuration, ProgressBar, ProgressStyle};

use crate::batch::BatchProgress;

// =============================================================================
// Step Emojis (empty fallback on plain terminals)
// =============================================================================

/// Loading inputs
pub static LOOKING_GLASS: Emoji<'_, '_> = Emoji("🔍 ", "");
/// Diffing or applying
pub static GEAR: Emoji<'_, '_> = Emoji("⚙️  ", "");
/// Writing output
pub static DISK: Emoji<'_, '_> = Emoji("💾 ", "");
/// Finished
pub static SPARKLE: Emoji<'_, '_> = Emoji("✨ ", "");
/// Directory runs
pub static TRUCK: Emoji<'_, '_> = Emoji("🚚 ", "");

// =============================================================================
// Step-Based Progress
// =============================================================================

/// Print a step indicator: `[1/3] 🔍 Message...`
pub fn print_step(current: usize, total: usize, emoji: Emoji, msg: &str) {
    println!(
        "{} {}{}",
        style(format!("[{current}/{total}]")).bold().dim(),
        emoji,
        msg
    );
}

/// Print the elapsed time once a command finishes
pub fn print_done(elapsed: Duration) {
    println!("{} Done in {}", SPARKLE, HumanDuration(elapsed));
}

// =============================================================================
// Progress Bars
// =============================================================================

/// Bar style: `Objects.xml [####----] 50% (50/100)`
#[must_use]
pub fn bar_style_with_percent() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{msg} [{bar:40.cyan/blue}] {percent}% ({pos}/{len})")
        .expect("valid template")
        .progress_chars("##-")
}

/// Create a batch progress bar (hidden when `quiet`); its length follows the updates
#[must_use]
pub fn batch_bar(quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(0);
    pb.set_style(bar_style_with_percent());
    pb
}

/// Move a bar to a batch progress update.
pub fn update_bar(pb: &ProgressBar, progress: &BatchProgress) {
    pb.set_length(progress.total as u64);
    pb.set_position(progress.current as u64);
    if let Some(ref name) = progress.current_file {
        pb.set_message(name.clone());
    }
}
