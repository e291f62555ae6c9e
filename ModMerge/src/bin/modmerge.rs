//! `modmerge` binary

fn main() -> anyhow::Result<()> {
    modmerge::cli::run_cli()
}
