use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info};

use crate::constants::OUTPUT_FIELD_SEPARATOR;
use crate::core::comparator::AttributeComparator;
use crate::core::error_handler::{Diagnostics, StoreError};
use crate::core::record::{Attribute, Record};
use crate::core::store::RecordStore;
use crate::core::validation::{parse_attribute_list, parse_filter_clause};

/// How filter values are matched against a record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterMode {
    /// Each value must equal the text of the attribute it is keyed by.
    #[default]
    Attribute,
    /// Each value must equal one of the record's six stored lines, whichever
    /// attribute holds it.
    LineMembership,
}

/// Exact-match constraints, at most one value per attribute.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSpec {
    conditions: Vec<(Attribute, String)>,
}

impl FilterSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a constraint. A later value for the same attribute replaces the
    /// earlier one.
    pub fn insert(&mut self, attribute: Attribute, value: impl Into<String>) {
        let value = value.into();
        match self.conditions.iter_mut().find(|(a, _)| *a == attribute) {
            Some((_, existing)) => *existing = value,
            None => self.conditions.push((attribute, value)),
        }
    }

    pub fn conditions(&self) -> &[(Attribute, String)] {
        &self.conditions
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn matches(&self, record: &Record, mode: FilterMode) -> bool {
        match mode {
            FilterMode::Attribute => self
                .conditions
                .iter()
                .all(|(attribute, value)| record.attribute_as_text(*attribute) == *value),
            FilterMode::LineMembership => {
                let lines = record.to_lines();
                self.conditions
                    .iter()
                    .all(|(_, value)| lines.iter().any(|line| line == value))
            }
        }
    }
}

/// A validated query: which records to keep, how to order them and which
/// attributes to print.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filter: Option<FilterSpec>,
    pub order: Vec<Attribute>,
    pub select: Option<Vec<Attribute>>,
}

impl Query {
    /// Validate raw `select`, `filter` and `order` option strings.
    ///
    /// Unknown attribute names are reported to `diagnostics` and dropped. A
    /// malformed filter entry fails the query.
    pub fn from_options(
        select: Option<&str>,
        filter: Option<&str>,
        order: Option<&str>,
        diagnostics: &mut Diagnostics,
    ) -> Result<Self, StoreError> {
        let filter = filter
            .map(|clause| parse_filter_clause(clause, diagnostics))
            .transpose()?;
        let order = order
            .map(|clause| parse_attribute_list(clause, diagnostics))
            .unwrap_or_default();
        let select = select.map(|clause| parse_attribute_list(clause, diagnostics));

        Ok(Self {
            filter,
            order,
            select,
        })
    }
}

#[derive(Debug, Default, Clone)]
pub struct QueryStats {
    pub records_loaded: usize,
    pub records_skipped: usize,
    pub records_matched: usize,
    pub processing_time_seconds: f64,
}

#[derive(Debug, Clone)]
pub struct QueryOutput {
    pub lines: Vec<String>,
    pub stats: QueryStats,
}

/// Runs queries against a record store. Every query rescans the store; there
/// is no index.
pub struct QueryEngine {
    store: RecordStore,
    filter_mode: FilterMode,
}

impl QueryEngine {
    pub fn new(store: RecordStore, filter_mode: FilterMode) -> Self {
        Self { store, filter_mode }
    }

    /// Load every record file. Files that cannot be read or parsed are
    /// reported and left out; only an unlistable store directory is fatal.
    pub fn load_all(&self, diagnostics: &mut Diagnostics) -> Result<Vec<Record>, StoreError> {
        let files = self.store.list_files()?;
        let mut records = Vec::with_capacity(files.len());

        for path in &files {
            match self.store.read(path) {
                Ok(record) => records.push(record),
                Err(e) => diagnostics.report(&e, Some(path)),
            }
        }

        debug!(
            "Loaded {} of {} record files from {}",
            records.len(),
            files.len(),
            self.store.base_dir().display()
        );
        Ok(records)
    }

    /// load → filter → order → project.
    pub fn execute(
        &self,
        query: &Query,
        diagnostics: &mut Diagnostics,
    ) -> Result<QueryOutput, StoreError> {
        let start_time = Instant::now();
        let mut stats = QueryStats::default();

        let skipped_before = diagnostics.len();
        let mut records = self.load_all(diagnostics)?;
        stats.records_loaded = records.len();
        stats.records_skipped = diagnostics.len() - skipped_before;

        if let Some(spec) = query.filter.as_ref().filter(|spec| !spec.is_empty()) {
            records = filter(records, spec, self.filter_mode);
        }
        stats.records_matched = records.len();

        let records = order_by(records, &query.order);
        let lines = project(&records, query.select.as_deref());

        stats.processing_time_seconds = start_time.elapsed().as_secs_f64();
        info!(
            "Query matched {} of {} records in {:.3}s",
            stats.records_matched, stats.records_loaded, stats.processing_time_seconds
        );

        Ok(QueryOutput { lines, stats })
    }
}

/// Keep the records that satisfy every constraint in `spec`, in input order.
pub fn filter(records: Vec<Record>, spec: &FilterSpec, mode: FilterMode) -> Vec<Record> {
    records
        .into_iter()
        .filter(|record| spec.matches(record, mode))
        .collect()
}

/// Multi-key stable sort where earlier attributes take priority.
///
/// Sorts stably by the last attribute first and by the first attribute last,
/// so the first attribute dominates and later ones break ties.
pub fn order_by(mut records: Vec<Record>, attributes: &[Attribute]) -> Vec<Record> {
    for attribute in attributes.iter().rev() {
        let comparator = AttributeComparator::new(*attribute);
        records.sort_by(|a, b| comparator.compare(a, b));
    }
    records
}

/// Render each record as one comma-joined line of the selected attributes,
/// or of all six in canonical order when no selection is given.
pub fn project(records: &[Record], attributes: Option<&[Attribute]>) -> Vec<String> {
    let attributes = attributes.unwrap_or(&Attribute::ALL);

    records
        .iter()
        .map(|record| {
            attributes
                .iter()
                .map(|attribute| record.attribute_as_text(*attribute))
                .collect::<Vec<_>>()
                .join(OUTPUT_FIELD_SEPARATOR)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error_handler::DiagnosticKind;
    use std::fs;
    use tempfile::TempDir;

    fn record(stb: &str, title: &str, provider: &str, date: &str, price: &str, view_time: &str) -> Record {
        Record::parse(&[stb, title, provider, date, price, view_time]).unwrap()
    }

    fn stbs(records: &[Record]) -> Vec<&str> {
        records.iter().map(|r| r.stb()).collect()
    }

    #[test]
    fn test_order_by_leftmost_attribute_dominates() {
        let a = record("2", "A", "p", "2014-01-01", "1", "1:00");
        let b = record("1", "B", "p", "2014-01-01", "1", "1:00");
        let c = record("1", "C", "p", "2013-01-01", "1", "1:00");

        let ordered = order_by(vec![a, b, c], &[Attribute::Stb, Attribute::Date]);
        let titles: Vec<&str> = ordered.iter().map(|r| r.title()).collect();
        assert_eq!(titles, vec!["C", "B", "A"]);
    }

    #[test]
    fn test_order_by_is_stable() {
        let records = vec![
            record("s1", "x", "p", "2014-01-01", "4", "1:00"),
            record("s2", "y", "p", "2014-01-01", "3", "1:00"),
            record("s3", "x", "p", "2014-01-01", "2", "1:00"),
        ];

        let ordered = order_by(records, &[Attribute::Title]);
        assert_eq!(stbs(&ordered), vec!["s1", "s3", "s2"]);
    }

    #[test]
    fn test_order_by_rev_is_numeric() {
        let records = vec![
            record("s1", "t", "p", "2014-01-01", "10.00", "1:00"),
            record("s2", "t", "p", "2014-01-01", "9.5", "1:00"),
            record("s3", "t", "p", "2014-01-01", "100", "1:00"),
        ];

        let ordered = order_by(records, &[Attribute::Rev]);
        assert_eq!(stbs(&ordered), vec!["s2", "s1", "s3"]);
    }

    #[test]
    fn test_order_by_empty_keeps_input_order() {
        let records = vec![
            record("s2", "t", "p", "2014-01-01", "1", "1:00"),
            record("s1", "t", "p", "2014-01-01", "1", "1:00"),
        ];
        assert_eq!(stbs(&order_by(records, &[])), vec!["s2", "s1"]);
    }

    #[test]
    fn test_filter_by_attribute_is_exact() {
        let records = vec![
            record("s1", "X", "Acme", "2014-01-01", "1", "1:00"),
            record("s2", "Y", "X", "2014-01-01", "1", "1:00"),
            record("s3", "X ", "Acme", "2014-01-01", "1", "1:00"),
        ];
        let mut spec = FilterSpec::new();
        spec.insert(Attribute::Title, "X");

        let matched = filter(records, &spec, FilterMode::Attribute);
        assert_eq!(stbs(&matched), vec!["s1"]);
    }

    #[test]
    fn test_filter_by_line_membership_matches_any_attribute() {
        let records = vec![
            record("s1", "X", "Acme", "2014-01-01", "1", "1:00"),
            record("s2", "Y", "X", "2014-01-01", "1", "1:00"),
            record("s3", "Z", "Acme", "2014-01-01", "1", "1:00"),
        ];
        let mut spec = FilterSpec::new();
        spec.insert(Attribute::Title, "X");

        let matched = filter(records, &spec, FilterMode::LineMembership);
        assert_eq!(stbs(&matched), vec!["s1", "s2"]);
    }

    #[test]
    fn test_filter_uses_canonical_text() {
        let records = vec![
            record("s1", "t", "p", "2014-01-01", "4", "01:30"),
            record("s2", "t", "p", "2014-01-01", "4.5", "1:30"),
        ];
        let mut spec = FilterSpec::new();
        spec.insert(Attribute::Rev, "4.00");
        spec.insert(Attribute::ViewTime, "1:30");

        let matched = filter(records, &spec, FilterMode::Attribute);
        assert_eq!(stbs(&matched), vec!["s1"]);
    }

    #[test]
    fn test_project_defaults_to_all_attributes() {
        let records = vec![record("s1", "unbreakable", "buena vista", "2014-04-03", "6", "2:05")];
        assert_eq!(
            project(&records, None),
            vec!["s1,unbreakable,buena vista,2014-04-03,6.00,2:05"]
        );
    }

    #[test]
    fn test_project_selected_attributes_in_given_order() {
        let records = vec![record("s1", "unbreakable", "buena vista", "2014-04-03", "6", "2:05")];
        assert_eq!(
            project(&records, Some(&[Attribute::Rev, Attribute::Title][..])),
            vec!["6.00,unbreakable"]
        );
    }

    #[test]
    fn test_query_from_options() {
        let mut diagnostics = Diagnostics::new();
        let query = Query::from_options(
            Some("TITLE,COLOR,REV"),
            Some("PROVIDER=Acme"),
            Some("DATE,nope"),
            &mut diagnostics,
        )
        .unwrap();

        assert_eq!(query.select, Some(vec![Attribute::Title, Attribute::Rev]));
        assert_eq!(query.order, vec![Attribute::Date]);
        assert_eq!(
            query.filter.unwrap().conditions(),
            &[(Attribute::Provider, "Acme".to_string())]
        );
        assert_eq!(diagnostics.count(DiagnosticKind::InvalidAttributeToken), 2);
    }

    #[test]
    fn test_query_from_options_rejects_malformed_filter() {
        let mut diagnostics = Diagnostics::new();
        let err = Query::from_options(None, Some("PROVIDER"), None, &mut diagnostics).unwrap_err();
        assert!(matches!(err, StoreError::MalformedFilterToken(_)));
    }

    #[test]
    fn test_execute_skips_corrupt_files_and_filters_before_projection() {
        let temp_dir = TempDir::new().unwrap();
        let store = RecordStore::new(temp_dir.path());
        store.write(&record("s1", "a", "Acme", "2014-01-02", "1", "1:00")).unwrap();
        store.write(&record("s2", "b", "Other", "2014-01-01", "2", "1:00")).unwrap();
        store.write(&record("s3", "c", "Acme", "2014-01-01", "3", "1:00")).unwrap();
        fs::write(temp_dir.path().join("zz_corrupt.txt"), "s4\nd\nAcme\nnot-a-date\n1\n1:00\n").unwrap();

        let engine = QueryEngine::new(store, FilterMode::Attribute);
        let mut diagnostics = Diagnostics::new();
        let query = Query::from_options(
            Some("STB"),
            Some("PROVIDER=Acme"),
            Some("DATE"),
            &mut diagnostics,
        )
        .unwrap();

        let output = engine.execute(&query, &mut diagnostics).unwrap();

        assert_eq!(output.lines, vec!["s3", "s1"]);
        assert_eq!(output.stats.records_loaded, 3);
        assert_eq!(output.stats.records_skipped, 1);
        assert_eq!(output.stats.records_matched, 2);
        assert_eq!(diagnostics.count(DiagnosticKind::CorruptRecordFile), 1);
    }
}
