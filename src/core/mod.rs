pub mod comparator;
pub mod error_handler;
pub mod importer;
pub mod query;
pub mod record;
pub mod store;
pub mod validation;

pub use comparator::AttributeComparator;
pub use error_handler::{Diagnostics, StoreError};
pub use importer::{ImportStats, Importer};
pub use query::{FilterMode, FilterSpec, Query, QueryEngine};
pub use record::{Attribute, Record};
pub use store::RecordStore;
