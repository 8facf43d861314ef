pub const DEFAULT_STORE_DIRECTORY: &str = "dataStore";
pub const RECORD_FILE_EXTENSION: &str = "txt";
pub const STORAGE_KEY_SEPARATOR: char = '_';

pub const IMPORT_FIELD_SEPARATOR: char = '|';
pub const IMPORT_HEADER_LINES: usize = 1;
pub const RECORD_FIELD_COUNT: usize = 6;

pub const FILTER_PAIR_SEPARATOR: char = '=';
pub const CLAUSE_TOKEN_SEPARATOR: char = ',';
pub const OUTPUT_FIELD_SEPARATOR: &str = ",";

pub const PRICE_DECIMAL_DIGITS: usize = 2;
pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const VIEW_TIME_SEPARATOR: char = ':';

pub const VERBOSITY_SILENT: &str = "silent";
pub const VERBOSITY_NORMAL: &str = "normal";
pub const VERBOSITY_VERBOSE: &str = "verbose";
pub const LOG_TARGET_CRATE: &str = "viewstore";
