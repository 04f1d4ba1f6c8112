//! Command-line entry point for merging dashboard settings overlays.

use anyhow::Context;
use clap::Parser;
use horizon_overlay::cli::{Cli, run};
use std::io;

fn main() -> anyhow::Result<()> {
    horizon_overlay::init_logging();

    let cli = Cli::parse();
    let cwd = std::env::current_dir().context("failed to resolve current working directory")?;
    let stdout = io::stdout();
    let mut out = stdout.lock();
    run(cli, &cwd, &mut out, |name| std::env::var(name).ok())
}
