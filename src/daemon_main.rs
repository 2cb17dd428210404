// Launched by the browser host with stdin and stdout attached to the extension.

use anyhow::Result;
use clap::Parser;
use leettrack::daemon::{args::DaemonArgs, run_daemon};

fn main() -> Result<()> {
    run_daemon(DaemonArgs::parse())
}
