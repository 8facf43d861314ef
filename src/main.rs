use anyhow::Result;
use clap::Parser;
use std::io::{self, BufWriter};
use tracing::{debug, info};

use viewstore::cli::{self, Args};
use viewstore::utils;

fn main() -> Result<()> {
    let args = Args::parse();

    let config = args.resolve_config()?;
    utils::setup_logging(&config.logging.verbosity)?;

    debug!("Record store: {}", config.store_directory().display());

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let summary = cli::run(&args, &config, &mut out)?;

    if summary.diagnostics > 0 {
        info!("{} problems were reported and skipped", summary.diagnostics);
    }

    Ok(())
}
