use std::cmp::Ordering;

use crate::core::record::{Attribute, Record};

/// Orders records by a single attribute using that attribute's typed value:
/// ordinal text for STB/TITLE/PROVIDER, calendar order for DATE, numeric for
/// REV and time-of-day for VIEW_TIME.
#[derive(Debug, Clone, Copy)]
pub struct AttributeComparator {
    attribute: Attribute,
}

impl AttributeComparator {
    pub fn new(attribute: Attribute) -> Self {
        Self { attribute }
    }

    pub fn compare(&self, a: &Record, b: &Record) -> Ordering {
        (self.attribute.spec().compare)(a, b)
    }
}
