//! CLI commands for diff guides

use std::path::Path;

use console::style;

use crate::guide::GuideSet;

/// Load and validate a guide file
pub fn check(path: &Path) -> anyhow::Result<()> {
    let guides = GuideSet::load(path)?;

    println!("{} guide(s) in {}:", guides.len(), path.display());
    for guide in guides.iter() {
        println!(
            "  {} {} unique, {} non-unique, {} float list(s)",
            style(format!("<{}>", guide.root_tag)).bold(),
            guide.unique_signatures.len(),
            guide.non_unique_signatures.len(),
            guide.float_list_to_round.len()
        );
    }
    Ok(())
}
