use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::constants::RECORD_FILE_EXTENSION;
use crate::core::error_handler::StoreError;
use crate::core::record::{Attribute, Record};

/// File-per-record store rooted at a base directory.
///
/// Each record lives in `{stb}_{date}_{title}.txt` and holds its six canonical
/// attribute texts, one per line, in `Attribute::ALL` order.
#[derive(Debug, Clone)]
pub struct RecordStore {
    base_dir: PathBuf,
}

impl RecordStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Path of the file that holds `record`. Fails if a key component would
    /// place the file outside the base directory.
    pub fn path_for(&self, record: &Record) -> Result<PathBuf, StoreError> {
        for attribute in [Attribute::Stb, Attribute::Title] {
            let component = record.attribute_as_text(attribute);
            if !is_safe_key_component(&component) {
                return Err(StoreError::UnsafeKey {
                    attribute,
                    value: component,
                });
            }
        }

        Ok(self
            .base_dir
            .join(format!("{}.{}", record.storage_key(), RECORD_FILE_EXTENSION)))
    }

    /// Create or truncate the record's file and write its six lines.
    ///
    /// A base directory that cannot be created is `UnwritableStore`; a record
    /// file that cannot be created or written is `UnwritableFile`.
    pub fn write(&self, record: &Record) -> Result<PathBuf, StoreError> {
        let path = self.path_for(record)?;

        fs::create_dir_all(&self.base_dir).map_err(|source| StoreError::UnwritableStore {
            path: self.base_dir.clone(),
            source,
        })?;

        write_lines(&path, &record.to_lines()).map_err(|source| StoreError::UnwritableFile {
            path: path.clone(),
            source,
        })?;

        debug!("Indexed {}", path.display());
        Ok(path)
    }

    /// All record files, sorted by file name. A missing base directory is an
    /// empty store.
    pub fn list_files(&self) -> Result<Vec<PathBuf>, StoreError> {
        if !self.base_dir.exists() {
            debug!("Store directory {} does not exist yet", self.base_dir.display());
            return Ok(Vec::new());
        }

        let unreadable = |source: io::Error| StoreError::UnreadableFile {
            path: self.base_dir.clone(),
            source,
        };

        let mut files = Vec::new();
        for entry in fs::read_dir(&self.base_dir).map_err(unreadable)? {
            let path = entry.map_err(unreadable)?.path();

            if path.is_file() {
                if let Some(extension) = path.extension() {
                    if extension.to_string_lossy() == RECORD_FILE_EXTENSION {
                        files.push(path);
                    }
                }
            }
        }

        files.sort();
        Ok(files)
    }

    /// Raw lines of one record file. Trailing blank lines are dropped.
    pub fn read_lines(&self, path: &Path) -> Result<Vec<String>, StoreError> {
        let unreadable = |source: io::Error| StoreError::UnreadableFile {
            path: path.to_path_buf(),
            source,
        };

        let file = File::open(path).map_err(unreadable)?;
        let mut lines = BufReader::new(file)
            .lines()
            .collect::<io::Result<Vec<String>>>()
            .map_err(unreadable)?;

        while lines.last().is_some_and(|line| line.is_empty()) {
            lines.pop();
        }
        Ok(lines)
    }

    /// Read one record file back into a record.
    pub fn read(&self, path: &Path) -> Result<Record, StoreError> {
        let lines = self.read_lines(path)?;
        Record::reconstruct(&lines).map_err(|source| StoreError::CorruptRecordFile {
            path: path.to_path_buf(),
            source,
        })
    }
}

fn write_lines(path: &Path, lines: &[String]) -> io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    for line in lines {
        writeln!(writer, "{}", line)?;
    }
    writer.flush()
}

fn is_safe_key_component(component: &str) -> bool {
    !component.is_empty()
        && component != "."
        && component != ".."
        && !component.contains(['/', '\\'])
}
