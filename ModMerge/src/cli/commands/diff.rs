//! CLI commands for diffing and annotating

use std::path::Path;
use std::time::Instant;

use crate::cli::progress::{DISK, GEAR, LOOKING_GLASS, print_done, print_step};
use crate::command::CommandDocument;
use crate::diff::Differ;
use crate::formats::xml::{read_xml, to_xml_string};
use crate::guide::GuideSet;

/// Diff two files into a command document
pub fn diff(guides: &Path, base: &Path, modded: &Path, output: Option<&Path>, quiet: bool) -> anyhow::Result<()> {
    let start = Instant::now();
    // Step output would corrupt a document printed to stdout
    let show_steps = !quiet && output.is_some();

    if show_steps {
        print_step(1, 3, LOOKING_GLASS, "Reading documents...");
    }
    let guides = GuideSet::load(guides)?;
    let base_doc = read_xml(base)?;
    let modded_doc = read_xml(modded)?;
    let differ = Differ::new(guides.for_root(&base_doc.root.tag)?)?;

    if show_steps {
        print_step(2, 3, GEAR, "Diffing...");
    }
    let summary = differ.diff_documents(&base_doc.root, &modded_doc.root)?;
    let headline = summary.to_string();
    let document = CommandDocument::new(summary.root_tag, summary.commands);

    match output {
        Some(path) => {
            if show_steps {
                print_step(3, 3, DISK, &format!("Writing {}...", path.display()));
            }
            document.write(path, &base_doc.write_options())?;
        }
        None => print!("{}", to_xml_string(&document.to_element())?),
    }

    if show_steps {
        println!("{headline}");
        print_done(start.elapsed());
    }
    Ok(())
}

/// Print a file with its annotations
pub fn annotate(guides: &Path, input: &Path) -> anyhow::Result<()> {
    let guides = GuideSet::load(guides)?;
    let mut document = read_xml(input)?;
    let differ = Differ::new(guides.for_root(&document.root.tag)?)?;

    let stats = differ.annotate(&mut document.root)?;
    eprintln!(
        "Annotated {} node(s), {} duplicate(s), {} hashed subtree(s)",
        stats.nodes,
        stats.duplicates,
        stats.hashed
    );

    print!("{}", to_xml_string(&document.root)?);
    Ok(())
}
