use anyhow::{Context, Result};
use clap::Parser;
use std::io::Write;
use std::path::PathBuf;
use tracing::info;

use crate::config::Config;
use crate::core::error_handler::Diagnostics;
use crate::core::importer::{ImportStats, Importer};
use crate::core::query::{Query, QueryEngine, QueryStats};
use crate::core::store::RecordStore;
use crate::utils::format_duration;

#[derive(Parser, Debug, Clone, Default)]
#[command(name = "viewstore")]
#[command(about = "Import viewing events into a file-per-record store and query them")]
#[command(version)]
pub struct Args {
    #[arg(short, long, help = "Import records from a pipe-delimited file before querying")]
    pub import: Option<PathBuf>,

    #[arg(short, long, help = "Comma-separated attributes to display, e.g. TITLE,REV")]
    pub select: Option<String>,

    #[arg(short, long, help = "Comma-separated ATTRIBUTE=value exact-match filters")]
    pub filter: Option<String>,

    #[arg(short, long, help = "Comma-separated attributes to order by, leftmost first")]
    pub order: Option<String>,

    #[arg(short, long, help = "Configuration file (JSON)")]
    pub config: Option<PathBuf>,

    #[arg(long, help = "Record store directory, overrides the configuration")]
    pub store: Option<PathBuf>,

    #[arg(short, long, help = "Verbose output")]
    pub verbose: bool,
}

impl Args {
    /// Load the configuration file if one was given and apply command-line
    /// overrides on top of it.
    pub fn resolve_config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };

        if let Some(store) = &self.store {
            config.store.base_directory = store.to_string_lossy().into_owned();
        }
        if self.verbose {
            config.logging.verbosity = crate::constants::VERBOSITY_VERBOSE.to_string();
        }

        config.validate()?;
        Ok(config)
    }
}

#[derive(Debug, Default, Clone)]
pub struct RunSummary {
    pub import: Option<ImportStats>,
    pub query: QueryStats,
    pub diagnostics: usize,
}

/// Run the optional import, then the query, writing result lines to `out`.
pub fn run<W: Write>(args: &Args, config: &Config, out: &mut W) -> Result<RunSummary> {
    let store = RecordStore::new(config.store_directory());
    let mut diagnostics = match config.diagnostics_path() {
        Some(path) => Diagnostics::with_log_file(&path)?,
        None => Diagnostics::new(),
    };

    let mut summary = RunSummary::default();

    if let Some(import_path) = &args.import {
        let importer = Importer::new(store.clone());
        let stats = importer
            .import_from_source(import_path, &mut diagnostics)
            .with_context(|| format!("Import from {} failed", import_path.display()))?;
        info!(
            "Imported {} of {} lines in {}",
            stats.records_indexed,
            stats.lines_read,
            format_duration(stats.processing_time_seconds)
        );
        summary.import = Some(stats);
    }

    let query = Query::from_options(
        args.select.as_deref(),
        args.filter.as_deref(),
        args.order.as_deref(),
        &mut diagnostics,
    )?;

    let engine = QueryEngine::new(store, config.query.filter_mode);
    let output = engine
        .execute(&query, &mut diagnostics)
        .context("Query failed")?;

    for line in &output.lines {
        writeln!(out, "{}", line)?;
    }
    out.flush()?;

    diagnostics.flush()?;
    summary.query = output.stats;
    summary.diagnostics = diagnostics.len();
    Ok(summary)
}
