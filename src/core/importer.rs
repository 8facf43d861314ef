use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader, ErrorKind};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

use crate::constants::IMPORT_HEADER_LINES;
use crate::core::error_handler::{Diagnostics, StoreError};
use crate::core::record::Record;
use crate::core::store::RecordStore;
use crate::core::validation::split_import_line;

/// Import statistics
#[derive(Debug, Default, Clone)]
pub struct ImportStats {
    pub lines_read: usize,
    pub records_indexed: usize,
    pub duplicates_replaced: usize,
    pub malformed_lines: usize,
    pub unwritable_lines: usize,
    pub blank_lines: usize,
    pub processing_time_seconds: f64,
}

/// Writes pipe-delimited viewing events into a record store, one file per
/// (stb, date, title).
pub struct Importer {
    store: RecordStore,
}

impl Importer {
    pub fn new(store: RecordStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    /// Import every line after the header of `path`.
    ///
    /// Malformed lines and records whose own file cannot be written are
    /// reported to `diagnostics` and skipped. An empty path, an unreadable
    /// source or a store directory that cannot be created ends the import.
    pub fn import_from_source(
        &self,
        path: &Path,
        diagnostics: &mut Diagnostics,
    ) -> Result<ImportStats, StoreError> {
        if path.as_os_str().is_empty() {
            return Err(StoreError::InvalidInputPath);
        }

        let start_time = Instant::now();
        let unreadable = |source: std::io::Error| StoreError::UnreadableFile {
            path: path.to_path_buf(),
            source,
        };

        info!("Importing records from {}", path.display());
        let reader = BufReader::new(File::open(path).map_err(unreadable)?);

        let mut stats = ImportStats::default();
        let mut written: HashSet<PathBuf> = HashSet::new();

        for (index, line) in reader.lines().enumerate() {
            let line_number = index + 1;

            let line = match line {
                Ok(line) => line,
                Err(e) if e.kind() == ErrorKind::InvalidData => {
                    if index >= IMPORT_HEADER_LINES {
                        stats.lines_read += 1;
                        stats.malformed_lines += 1;
                        diagnostics.report(
                            &StoreError::MalformedLine {
                                line_number,
                                reason: e.to_string(),
                            },
                            Some(path),
                        );
                    }
                    continue;
                }
                Err(e) => return Err(unreadable(e)),
            };

            if index < IMPORT_HEADER_LINES {
                debug!("Skipping header: {}", line);
                continue;
            }
            stats.lines_read += 1;

            if line.trim().is_empty() {
                stats.blank_lines += 1;
                continue;
            }

            match self.index_record(&split_import_line(&line)) {
                Ok(record_path) => {
                    stats.records_indexed += 1;
                    if !written.insert(record_path) {
                        stats.duplicates_replaced += 1;
                    }
                }
                Err(e @ StoreError::UnwritableStore { .. }) => return Err(e),
                Err(e @ StoreError::UnwritableFile { .. }) => {
                    stats.unwritable_lines += 1;
                    debug!("Line {} could not be stored", line_number);
                    diagnostics.report(&e, Some(path));
                }
                Err(e) => {
                    stats.malformed_lines += 1;
                    diagnostics.report(
                        &StoreError::MalformedLine {
                            line_number,
                            reason: e.to_string(),
                        },
                        Some(path),
                    );
                }
            }
        }

        stats.processing_time_seconds = start_time.elapsed().as_secs_f64();
        info!(
            "Indexed {} records ({} replaced, {} malformed lines, {} unwritable) into {} in {:.3}s",
            stats.records_indexed,
            stats.duplicates_replaced,
            stats.malformed_lines,
            stats.unwritable_lines,
            self.store.base_dir().display(),
            stats.processing_time_seconds
        );

        Ok(stats)
    }

    /// Parse one line's fields and persist the record, replacing any earlier
    /// record with the same (stb, date, title). Nothing is written when a
    /// field fails to parse.
    pub fn index_record<S: AsRef<str>>(&self, fields: &[S]) -> Result<PathBuf, StoreError> {
        let record = Record::parse(fields)?;
        self.store.write(&record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error_handler::DiagnosticKind;
    use std::fs;
    use tempfile::TempDir;

    const HEADER: &str = "STB|TITLE|PROVIDER|DATE|REV|VIEW_TIME";

    fn setup(content: &str) -> (TempDir, PathBuf, Importer) {
        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.path().join("input.txt");
        fs::write(&input, content).unwrap();
        let importer = Importer::new(RecordStore::new(temp_dir.path().join("store")));
        (temp_dir, input, importer)
    }

    #[test]
    fn test_import_skips_header() {
        let content = format!(
            "{}\nstb1|the matrix|warner bros|2014-04-01|4.00|1:30\nstb2|unbreakable|buena vista|2014-04-03|6.00|2:05\n",
            HEADER
        );
        let (_temp_dir, input, importer) = setup(&content);
        let mut diagnostics = Diagnostics::new();

        let stats = importer.import_from_source(&input, &mut diagnostics).unwrap();

        assert_eq!(stats.lines_read, 2);
        assert_eq!(stats.records_indexed, 2);
        assert_eq!(importer.store().list_files().unwrap().len(), 2);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_import_short_files_yield_nothing() {
        for content in ["", HEADER, "stb1|the matrix|warner bros|2014-04-01|4.00|1:30"] {
            let (_temp_dir, input, importer) = setup(content);
            let mut diagnostics = Diagnostics::new();

            let stats = importer.import_from_source(&input, &mut diagnostics).unwrap();
            assert_eq!(stats.records_indexed, 0);
            assert!(importer.store().list_files().unwrap().is_empty());
        }
    }

    #[test]
    fn test_import_same_key_twice_keeps_last() {
        let content = format!(
            "{}\nstb1|the matrix|warner bros|2014-04-01|4.00|1:30\nstb1|the matrix|hbo|2014-04-01|5.00|1:45\n",
            HEADER
        );
        let (_temp_dir, input, importer) = setup(&content);
        let mut diagnostics = Diagnostics::new();

        let stats = importer.import_from_source(&input, &mut diagnostics).unwrap();
        assert_eq!(stats.records_indexed, 2);
        assert_eq!(stats.duplicates_replaced, 1);

        let files = importer.store().list_files().unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(importer.store().read(&files[0]).unwrap().provider(), "hbo");
    }

    #[test]
    fn test_import_skips_malformed_lines_and_continues() {
        let content = format!(
            "{}\nstb1|the matrix|warner bros|2014-13-50|4.00|1:30\nstb2|too|few\n\nstb3|unbreakable|buena vista|2014-04-03|6.00|2:05\n",
            HEADER
        );
        let (_temp_dir, input, importer) = setup(&content);
        let mut diagnostics = Diagnostics::new();

        let stats = importer.import_from_source(&input, &mut diagnostics).unwrap();

        assert_eq!(stats.records_indexed, 1);
        assert_eq!(stats.malformed_lines, 2);
        assert_eq!(stats.blank_lines, 1);
        assert_eq!(diagnostics.count(DiagnosticKind::MalformedLine), 2);
        assert!(diagnostics.entries()[0].message.starts_with("line 2:"));
        assert!(diagnostics.entries()[1].message.starts_with("line 3:"));

        let files = importer.store().list_files().unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("stb3_2014-04-03_unbreakable.txt"));
    }

    #[test]
    fn test_import_continues_past_unwritable_record() {
        let content = format!(
            "{}\nstb1|ok|Acme|2014-04-01|1.00|1:00\nstb2|{}|Acme|2014-04-01|1.00|1:00\nstb3|later|Acme|2014-04-01|1.00|1:00\n",
            HEADER,
            "t".repeat(300)
        );
        let (_temp_dir, input, importer) = setup(&content);
        let mut diagnostics = Diagnostics::new();

        let stats = importer.import_from_source(&input, &mut diagnostics).unwrap();

        assert_eq!(stats.records_indexed, 2);
        assert_eq!(stats.unwritable_lines, 1);
        assert_eq!(stats.malformed_lines, 0);
        assert_eq!(diagnostics.count(DiagnosticKind::Io), 1);

        let files = importer.store().list_files().unwrap();
        assert_eq!(files.len(), 2);
        assert!(files[1].ends_with("stb3_2014-04-01_later.txt"));
    }

    #[test]
    fn test_import_fails_when_store_directory_cannot_be_created() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("blocker");
        fs::write(&blocker, "not a directory").unwrap();
        let input = temp_dir.path().join("input.txt");
        fs::write(&input, format!("{}\nstb1|ok|Acme|2014-04-01|1.00|1:00\n", HEADER)).unwrap();

        let importer = Importer::new(RecordStore::new(blocker));
        let mut diagnostics = Diagnostics::new();
        let err = importer.import_from_source(&input, &mut diagnostics).unwrap_err();
        assert!(matches!(err, StoreError::UnwritableStore { .. }));
    }

    #[test]
    fn test_import_empty_path() {
        let importer = Importer::new(RecordStore::new("unused"));
        let mut diagnostics = Diagnostics::new();
        let err = importer
            .import_from_source(Path::new(""), &mut diagnostics)
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidInputPath));
    }

    #[test]
    fn test_import_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let importer = Importer::new(RecordStore::new(temp_dir.path().join("store")));
        let mut diagnostics = Diagnostics::new();

        let err = importer
            .import_from_source(&temp_dir.path().join("absent.txt"), &mut diagnostics)
            .unwrap_err();
        assert!(matches!(err, StoreError::UnreadableFile { .. }));
    }

    #[test]
    fn test_index_record_rejects_bad_field_without_writing() {
        let temp_dir = TempDir::new().unwrap();
        let importer = Importer::new(RecordStore::new(temp_dir.path()));

        let err = importer
            .index_record(&["stb1", "the matrix", "warner bros", "2014-04-01", "free", "1:30"])
            .unwrap_err();
        assert!(matches!(err, StoreError::Record(_)));
        assert!(importer.store().list_files().unwrap().is_empty());
    }
}
