use anyhow::Result;
use leettrack::cli::run_cli;

fn main() -> Result<()> {
    run_cli()
}
