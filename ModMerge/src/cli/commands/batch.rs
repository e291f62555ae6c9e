//! CLI commands for directory-level diff and apply

use std::path::Path;
use std::time::Instant;

use crate::batch::{self, BatchProgress, BatchResult};
use crate::cli::progress::{TRUCK, batch_bar, print_done, update_bar};
use crate::guide::GuideSet;
use crate::merge::MergeOptions;

/// Batch diff two directories
pub fn diff(guides: &Path, base: &Path, modded: &Path, dest: &Path, quiet: bool) -> anyhow::Result<()> {
    let start = Instant::now();
    let guides = GuideSet::load(guides)?;

    if !quiet {
        println!("{}Diffing {} against {}", TRUCK, modded.display(), base.display());
    }
    let pb = batch_bar(quiet);
    let result = batch::diff_directories(base, modded, dest, &guides, &|progress: &BatchProgress| update_bar(&pb, progress))?;
    pb.finish_and_clear();

    report("Diff", &result, start, quiet);
    Ok(())
}

/// Batch apply a directory of command documents
pub fn apply(base: &Path, commands: &Path, dest: &Path, stop_on_error: bool, quiet: bool) -> anyhow::Result<()> {
    let start = Instant::now();
    let options = if stop_on_error {
        MergeOptions::stop_on_first()
    } else {
        MergeOptions::default()
    };

    if !quiet {
        println!("{}Applying {} to {}", TRUCK, commands.display(), base.display());
    }
    let pb = batch_bar(quiet);
    let result = batch::apply_directory(base, commands, dest, &options, &|progress: &BatchProgress| update_bar(&pb, progress))?;
    pb.finish_and_clear();

    report("Apply", &result, start, quiet);
    if result.fail_count > 0 {
        anyhow::bail!("{} file(s) failed", result.fail_count);
    }
    Ok(())
}

fn report(operation: &str, result: &BatchResult, start: Instant, quiet: bool) {
    if quiet && result.fail_count == 0 {
        return;
    }

    println!();
    println!("{operation} complete:");
    println!("  Success: {}", result.success_count);
    println!("  Skipped: {}", result.skip_count);
    println!("  Failed: {}", result.fail_count);

    if result.fail_count > 0 {
        println!();
        println!("Failures:");
        for msg in result.results.iter().filter(|m| m.starts_with("Failed") || m.contains("with errors")) {
            println!("  {msg}");
        }
    }

    if !quiet {
        print_done(start.elapsed());
    }
}
