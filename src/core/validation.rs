use crate::constants::{CLAUSE_TOKEN_SEPARATOR, FILTER_PAIR_SEPARATOR, IMPORT_FIELD_SEPARATOR};
use crate::core::error_handler::{Diagnostics, StoreError};
use crate::core::query::FilterSpec;
use crate::core::record::Attribute;

/// Split one import line into its `|`-separated fields. The line is trimmed
/// as a whole; individual fields are kept verbatim.
pub fn split_import_line(line: &str) -> Vec<&str> {
    line.trim().split(IMPORT_FIELD_SEPARATOR).collect()
}

// Blank tokens are dropped; the rest are returned untrimmed.
fn clause_tokens(clause: &str) -> impl Iterator<Item = &str> {
    clause
        .split(CLAUSE_TOKEN_SEPARATOR)
        .filter(|token| !token.trim().is_empty())
}

/// Resolve a comma-separated list of attribute names, keeping the given order.
/// Unknown names are reported and dropped.
pub fn parse_attribute_list(clause: &str, diagnostics: &mut Diagnostics) -> Vec<Attribute> {
    clause_tokens(clause)
        .map(str::trim)
        .filter_map(|token| match token.parse::<Attribute>() {
            Ok(attribute) => Some(attribute),
            Err(_) => {
                diagnostics.report(&StoreError::InvalidAttributeToken(token.to_string()), None);
                None
            }
        })
        .collect()
}

/// Parse `ATTRIBUTE=value[,ATTRIBUTE=value...]`.
///
/// A token without `=` fails the whole clause. Unknown attribute names are
/// reported and dropped. Only the first `=` separates key from value. Keys are
/// trimmed; values are kept verbatim.
pub fn parse_filter_clause(
    clause: &str,
    diagnostics: &mut Diagnostics,
) -> Result<FilterSpec, StoreError> {
    let mut spec = FilterSpec::default();

    for token in clause_tokens(clause) {
        let (key, value) = token
            .split_once(FILTER_PAIR_SEPARATOR)
            .ok_or_else(|| StoreError::MalformedFilterToken(token.trim().to_string()))?;

        match key.trim().parse::<Attribute>() {
            Ok(attribute) => spec.insert(attribute, value),
            Err(_) => {
                diagnostics.report(&StoreError::InvalidAttributeToken(key.trim().to_string()), None)
            }
        }
    }

    Ok(spec)
}
