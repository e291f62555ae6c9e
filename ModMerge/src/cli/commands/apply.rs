//! CLI command for applying a command document

use std::path::Path;
use std::time::Instant;

use crate::cli::progress::{DISK, GEAR, print_done, print_step};
use crate::formats::xml::{to_xml_string, write_xml};
use crate::merge::{MergeOptions, Merger};

/// Apply commands to a base file
pub fn apply(base: &Path, commands: &Path, output: Option<&Path>, stop_on_error: bool, quiet: bool) -> anyhow::Result<()> {
    let start = Instant::now();
    let show_steps = !quiet && output.is_some();

    let options = if stop_on_error {
        MergeOptions::stop_on_first()
    } else {
        MergeOptions::default()
    };

    if show_steps {
        print_step(1, 2, GEAR, "Applying commands...");
    }
    let (merged, report) = Merger::new(options).apply_files(base, commands)?;

    match output {
        Some(path) => {
            if show_steps {
                print_step(2, 2, DISK, &format!("Writing {}...", path.display()));
            }
            write_xml(&merged.root, path, &merged.write_options())?;
        }
        None => print!("{}", to_xml_string(&merged.root)?),
    }

    if !report.is_clean() {
        eprint!("{report}");
        anyhow::bail!("{} of {} command(s) failed", report.failures.len(), report.outcomes.len());
    }

    if show_steps {
        println!("{}", report.summary());
        print_done(start.elapsed());
    }
    Ok(())
}
