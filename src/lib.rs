// Record model, store, importer and query engine
pub mod core;

// Command-line options and the import-then-query runner
pub mod cli;

pub mod config;
pub mod constants;
pub mod utils;

// Re-export main types for convenience
pub use config::Config;
pub use crate::core::{
    AttributeComparator, Attribute, Diagnostics, FilterMode, FilterSpec, ImportStats, Importer,
    Query, QueryEngine, Record, RecordStore, StoreError,
};
