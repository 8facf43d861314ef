use anyhow::{Context, Result};
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

use crate::core::record::{Attribute, ParseError};

/// Error types for importing into and querying the record store
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("import path must not be empty")]
    InvalidInputPath,

    #[error("line {line_number}: {reason}")]
    MalformedLine { line_number: usize, reason: String },

    #[error("cannot read {}: {source}", path.display())]
    UnreadableFile { path: PathBuf, source: io::Error },

    #[error("cannot write {}: {source}", path.display())]
    UnwritableFile { path: PathBuf, source: io::Error },

    #[error("cannot create store directory {}: {source}", path.display())]
    UnwritableStore { path: PathBuf, source: io::Error },

    #[error(transparent)]
    Record(#[from] ParseError),

    #[error("corrupt record file {}: {source}", path.display())]
    CorruptRecordFile { path: PathBuf, source: ParseError },

    #[error("{attribute} value '{value}' cannot be used in a record file name")]
    UnsafeKey { attribute: Attribute, value: String },

    #[error("attribute {0} is not a valid attribute for filtering/ordering/selecting records")]
    InvalidAttributeToken(String),

    #[error("filter entry '{0}' is not of the form ATTRIBUTE=value")]
    MalformedFilterToken(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    MalformedLine,
    CorruptRecordFile,
    InvalidAttributeToken,
    Io,
    InvalidInput,
}

impl StoreError {
    pub fn kind(&self) -> DiagnosticKind {
        match self {
            StoreError::MalformedLine { .. } | StoreError::Record(_) => {
                DiagnosticKind::MalformedLine
            }
            StoreError::CorruptRecordFile { .. } => DiagnosticKind::CorruptRecordFile,
            StoreError::InvalidAttributeToken(_) => DiagnosticKind::InvalidAttributeToken,
            StoreError::UnreadableFile { .. }
            | StoreError::UnwritableFile { .. }
            | StoreError::UnwritableStore { .. } => DiagnosticKind::Io,
            StoreError::InvalidInputPath
            | StoreError::UnsafeKey { .. }
            | StoreError::MalformedFilterToken(_) => DiagnosticKind::InvalidInput,
        }
    }
}

/// A non-fatal problem that was reported and skipped over.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
    pub file_path: Option<PathBuf>,
}

/// Collects non-fatal errors (bad import lines, corrupt record files, unknown
/// attribute tokens) so an import or query can keep going past them.
///
/// Every entry is logged through `tracing` and, when a diagnostics file is
/// configured, appended to it with a timestamp.
#[derive(Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
    log_path: Option<PathBuf>,
    log_writer: Option<BufWriter<File>>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_log_file(log_path: &Path) -> Result<Self> {
        let log_file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)
            .with_context(|| format!("Failed to open diagnostics file {}", log_path.display()))?;

        Ok(Self {
            entries: Vec::new(),
            log_path: Some(log_path.to_path_buf()),
            log_writer: Some(BufWriter::new(log_file)),
        })
    }

    pub fn report(&mut self, error: &StoreError, file_path: Option<&Path>) {
        let message = error.to_string();
        match file_path {
            Some(path) => warn!("{} ({})", message, path.display()),
            None => warn!("{}", message),
        }

        if let Some(writer) = self.log_writer.as_mut() {
            let entry = format!(
                "[{}] {:?} - {} - File: {:?}\n",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                error.kind(),
                message,
                file_path
            );
            if let Err(e) = writer.write_all(entry.as_bytes()) {
                warn!("Diagnostics file is no longer writable, logging to console only: {}", e);
                self.log_writer = None;
            }
        }

        self.entries.push(Diagnostic {
            kind: error.kind(),
            message,
            file_path: file_path.map(Path::to_path_buf),
        });
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    pub fn count(&self, kind: DiagnosticKind) -> usize {
        self.entries.iter().filter(|d| d.kind == kind).count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn flush(&mut self) -> Result<()> {
        if let Some(writer) = self.log_writer.as_mut() {
            writer.flush().with_context(|| {
                format!(
                    "Failed to flush diagnostics file {}",
                    self.log_path.as_deref().unwrap_or(Path::new("")).display()
                )
            })?;
        }
        Ok(())
    }
}
