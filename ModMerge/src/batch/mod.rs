//! Batch diff and apply over directory trees
//!
//! Files are paired by their path relative to each input directory and
//! processed in parallel. Every pair owns its own trees; the guides and
//! differs are shared read-only.

mod types;

pub use types::{BatchPhase, BatchProgress, BatchProgressCallback, BatchResult, FileOutcome};

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use rayon::prelude::*;
use walkdir::WalkDir;

use crate::command::CommandDocument;
use crate::diff::Differ;
use crate::error::Result;
use crate::formats::xml::{read_xml, write_xml};
use crate::guide::GuideSet;
use crate::merge::{MergeOptions, Merger};

/// Find all .xml files in a directory recursively
///
/// # Returns
/// A sorted list of paths to .xml files found in the directory tree.
pub fn find_xml_files<P: AsRef<Path>>(dir: P) -> Vec<PathBuf> {
    let mut xml_files: Vec<_> = WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|e| {
            e.path().is_file()
                && e.path()
                    .extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("xml"))
        })
        .map(|e| e.path().to_path_buf())
        .collect();

    xml_files.sort();
    xml_files
}

/// Diff every modded file against its base counterpart
///
/// For each `.xml` under `modded_dir` with a file at the same relative path
/// under `base_dir`, writes a command document to the same relative path
/// under `out_dir`. Files with no counterpart or no guide for their root tag
/// are skipped; unchanged pairs produce no output.
///
/// # Errors
/// Returns an error only if a guide is invalid. Per-file errors are counted
/// in the result.
pub fn diff_directories(
    base_dir: &Path,
    modded_dir: &Path,
    out_dir: &Path,
    guides: &GuideSet,
    progress: BatchProgressCallback<'_>,
) -> Result<BatchResult> {
    let differs = guides
        .iter()
        .map(|guide| Ok((guide.root_tag.clone(), Differ::new(guide)?)))
        .collect::<Result<HashMap<String, Differ>>>()?;

    progress(&BatchProgress::new(BatchPhase::Scanning, 0, 0));
    let files = find_xml_files(modded_dir);
    let processed = AtomicUsize::new(0);
    let total = files.len();

    let outcomes: Vec<(FileOutcome, String)> = files
        .par_iter()
        .map(|modded_path| {
            let relative_path = modded_path.strip_prefix(modded_dir).unwrap_or(modded_path.as_path());
            let display_path = relative_path.to_string_lossy().to_string();

            let current = processed.fetch_add(1, Ordering::SeqCst) + 1;
            progress(&BatchProgress::with_file(BatchPhase::Diffing, current, total, display_path.clone()));

            let base_path = base_dir.join(relative_path);
            if !base_path.is_file() {
                tracing::warn!("No base file for {}, skipping", display_path);
                return (FileOutcome::Skipped, format!("Skipped {display_path}: no base file"));
            }

            match diff_pair(&base_path, modded_path, &out_dir.join(relative_path), &differs) {
                Ok(FileOutcome::Skipped) => (FileOutcome::Skipped, format!("Skipped {display_path}: no diff guide")),
                Ok(FileOutcome::Unchanged) => (FileOutcome::Unchanged, format!("Unchanged: {display_path}")),
                Ok(outcome) => (outcome, format!("Diffed: {display_path}")),
                Err(e) => (FileOutcome::Failed, format!("Failed {display_path}: {e}")),
            }
        })
        .collect();

    progress(&BatchProgress::new(BatchPhase::Complete, total, total));
    Ok(BatchResult::collect(outcomes))
}

fn diff_pair(base_path: &Path, modded_path: &Path, out_path: &Path, differs: &HashMap<String, Differ>) -> Result<FileOutcome> {
    let base = read_xml(base_path)?;
    let modded = read_xml(modded_path)?;

    let Some(differ) = differs.get(&base.root.tag) else {
        tracing::warn!("No diff guide for <{}> in {}", base.root.tag, base_path.display());
        return Ok(FileOutcome::Skipped);
    };

    let summary = differ.diff_documents(&base.root, &modded.root)?;
    if summary.is_empty() {
        return Ok(FileOutcome::Unchanged);
    }

    if let Some(parent) = out_path.parent() {
        fs::create_dir_all(parent)?;
    }
    CommandDocument::new(summary.root_tag, summary.commands).write(out_path, &base.write_options())?;
    Ok(FileOutcome::Written)
}

/// Apply every command document to its base counterpart
///
/// For each `.xml` under `commands_dir`, reads the file at the same relative
/// path under `base_dir`, applies the commands and writes the merged tree to
/// `out_dir` in the base file's encoding. A file whose report has failures is
/// still written but counted as failed.
///
/// # Errors
/// Per-file errors are counted in the result; this never fails as a whole.
pub fn apply_directory(
    base_dir: &Path,
    commands_dir: &Path,
    out_dir: &Path,
    options: &MergeOptions,
    progress: BatchProgressCallback<'_>,
) -> Result<BatchResult> {
    let merger = Merger::new(*options);

    progress(&BatchProgress::new(BatchPhase::Scanning, 0, 0));
    let files = find_xml_files(commands_dir);
    let processed = AtomicUsize::new(0);
    let total = files.len();

    let outcomes: Vec<(FileOutcome, String)> = files
        .par_iter()
        .map(|commands_path| {
            let relative_path = commands_path.strip_prefix(commands_dir).unwrap_or(commands_path.as_path());
            let display_path = relative_path.to_string_lossy().to_string();

            let current = processed.fetch_add(1, Ordering::SeqCst) + 1;
            progress(&BatchProgress::with_file(BatchPhase::Applying, current, total, display_path.clone()));

            let base_path = base_dir.join(relative_path);
            if !base_path.is_file() {
                tracing::warn!("No base file for {}, skipping", display_path);
                return (FileOutcome::Skipped, format!("Skipped {display_path}: no base file"));
            }

            let out_path = out_dir.join(relative_path);
            let applied = merger.apply_files(&base_path, commands_path).and_then(|(merged, report)| {
                if let Some(parent) = out_path.parent() {
                    fs::create_dir_all(parent)?;
                }
                write_xml(&merged.root, &out_path, &merged.write_options())?;
                Ok(report)
            });

            match applied {
                Ok(report) if report.is_clean() => (FileOutcome::Written, format!("Applied: {display_path}")),
                Ok(report) => (FileOutcome::Failed, format!("Applied {display_path} with errors: {}", report.summary())),
                Err(e) => (FileOutcome::Failed, format!("Failed {display_path}: {e}")),
            }
        })
        .collect();

    progress(&BatchProgress::new(BatchPhase::Complete, total, total));
    Ok(BatchResult::collect(outcomes))
}
