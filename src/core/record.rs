use chrono::{NaiveDate, NaiveTime, Timelike};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::constants::{
    DATE_FORMAT, PRICE_DECIMAL_DIGITS, RECORD_FIELD_COUNT, STORAGE_KEY_SEPARATOR,
    VIEW_TIME_SEPARATOR,
};

/// The six attributes of a viewing event, in canonical storage order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attribute {
    Stb,
    Title,
    Provider,
    Date,
    Rev,
    ViewTime,
}

impl Attribute {
    pub const ALL: [Attribute; RECORD_FIELD_COUNT] = [
        Attribute::Stb,
        Attribute::Title,
        Attribute::Provider,
        Attribute::Date,
        Attribute::Rev,
        Attribute::ViewTime,
    ];

    pub fn spec(self) -> &'static AttributeSpec {
        &ATTRIBUTE_TABLE[self as usize]
    }

    pub fn name(self) -> &'static str {
        self.spec().name
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("'{0}' is not a recognized attribute")]
pub struct UnknownAttribute(pub String);

impl FromStr for Attribute {
    type Err = UnknownAttribute;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        ATTRIBUTE_TABLE
            .iter()
            .find(|spec| spec.name == token)
            .map(|spec| spec.attribute)
            .ok_or_else(|| UnknownAttribute(token.to_string()))
    }
}

/// Per-attribute behavior. Everything that varies by attribute lives in
/// `ATTRIBUTE_TABLE`, indexed by the attribute's discriminant.
pub struct AttributeSpec {
    pub attribute: Attribute,
    pub name: &'static str,
    pub render: fn(&Record) -> String,
    pub compare: fn(&Record, &Record) -> Ordering,
}

static ATTRIBUTE_TABLE: [AttributeSpec; RECORD_FIELD_COUNT] = [
    AttributeSpec {
        attribute: Attribute::Stb,
        name: "STB",
        render: render_stb,
        compare: compare_stb,
    },
    AttributeSpec {
        attribute: Attribute::Title,
        name: "TITLE",
        render: render_title,
        compare: compare_title,
    },
    AttributeSpec {
        attribute: Attribute::Provider,
        name: "PROVIDER",
        render: render_provider,
        compare: compare_provider,
    },
    AttributeSpec {
        attribute: Attribute::Date,
        name: "DATE",
        render: render_date,
        compare: compare_date,
    },
    AttributeSpec {
        attribute: Attribute::Rev,
        name: "REV",
        render: render_rev,
        compare: compare_rev,
    },
    AttributeSpec {
        attribute: Attribute::ViewTime,
        name: "VIEW_TIME",
        render: render_view_time,
        compare: compare_view_time,
    },
];

fn render_stb(record: &Record) -> String {
    record.stb.clone()
}

fn render_title(record: &Record) -> String {
    record.title.clone()
}

fn render_provider(record: &Record) -> String {
    record.provider.clone()
}

fn render_date(record: &Record) -> String {
    record.date.format(DATE_FORMAT).to_string()
}

fn render_rev(record: &Record) -> String {
    round_half_up(record.price, PRICE_DECIMAL_DIGITS)
}

/// Fixed-point text of `value` with `digits` decimals, rounding half up on
/// the shortest decimal form of the value: 0.125 gives 0.13, 8.005 gives 8.01.
fn round_half_up(value: f64, digits: usize) -> String {
    let shortest = value.abs().to_string();
    let (whole, fraction) = shortest.split_once('.').unwrap_or((shortest.as_str(), ""));

    let mut kept: Vec<char> = whole
        .chars()
        .chain(fraction.chars().chain(std::iter::repeat('0')).take(digits))
        .collect();

    if fraction.chars().nth(digits).is_some_and(|next| next >= '5') {
        let mut carry = true;
        for digit in kept.iter_mut().rev() {
            if *digit == '9' {
                *digit = '0';
            } else {
                *digit = char::from(*digit as u8 + 1);
                carry = false;
                break;
            }
        }
        if carry {
            kept.insert(0, '1');
        }
    }

    let negative = value.is_sign_negative() && kept.iter().any(|digit| *digit != '0');
    let split = kept.len() - digits;
    let mut text = String::with_capacity(kept.len() + 2);
    if negative {
        text.push('-');
    }
    text.extend(&kept[..split]);
    if digits > 0 {
        text.push('.');
        text.extend(&kept[split..]);
    }
    text
}

// Hour is not zero-padded, minute always is: 9:05, 12:30.
fn render_view_time(record: &Record) -> String {
    format!(
        "{}{}{:02}",
        record.view_time.hour(),
        VIEW_TIME_SEPARATOR,
        record.view_time.minute()
    )
}

fn compare_stb(a: &Record, b: &Record) -> Ordering {
    a.stb.cmp(&b.stb)
}

fn compare_title(a: &Record, b: &Record) -> Ordering {
    a.title.cmp(&b.title)
}

fn compare_provider(a: &Record, b: &Record) -> Ordering {
    a.provider.cmp(&b.provider)
}

fn compare_date(a: &Record, b: &Record) -> Ordering {
    a.date.cmp(&b.date)
}

fn compare_rev(a: &Record, b: &Record) -> Ordering {
    a.price.total_cmp(&b.price)
}

fn compare_view_time(a: &Record, b: &Record) -> Ordering {
    a.view_time.cmp(&b.view_time)
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("expected {expected} fields, found {found}")]
    FieldCount { expected: usize, found: usize },

    #[error("invalid {attribute} value '{value}': {reason}")]
    InvalidField {
        attribute: Attribute,
        value: String,
        reason: String,
    },
}

impl ParseError {
    fn invalid(attribute: Attribute, value: &str, reason: impl Into<String>) -> Self {
        ParseError::InvalidField {
            attribute,
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    /// The attribute whose text failed to parse, if the failure was field-specific.
    pub fn attribute(&self) -> Option<Attribute> {
        match self {
            ParseError::InvalidField { attribute, .. } => Some(*attribute),
            ParseError::FieldCount { .. } => None,
        }
    }
}

/// One viewing event. Always fully populated; there is no way to build a
/// partially parsed record.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    stb: String,
    title: String,
    provider: String,
    date: NaiveDate,
    price: f64,
    view_time: NaiveTime,
}

impl Record {
    pub fn new(
        stb: impl Into<String>,
        title: impl Into<String>,
        provider: impl Into<String>,
        date: NaiveDate,
        price: f64,
        view_time: NaiveTime,
    ) -> Self {
        Self {
            stb: stb.into(),
            title: title.into(),
            provider: provider.into(),
            date,
            price,
            view_time,
        }
    }

    /// Build a record from positional import fields:
    /// `[stb, title, provider, date, price, view_time]`.
    pub fn parse<S: AsRef<str>>(fields: &[S]) -> Result<Self, ParseError> {
        if fields.len() != RECORD_FIELD_COUNT {
            return Err(ParseError::FieldCount {
                expected: RECORD_FIELD_COUNT,
                found: fields.len(),
            });
        }

        let stb = parse_text(Attribute::Stb, fields[0].as_ref())?;
        let title = parse_text(Attribute::Title, fields[1].as_ref())?;
        let provider = parse_text(Attribute::Provider, fields[2].as_ref())?;
        let date = parse_date(fields[3].as_ref())?;
        let price = parse_price(fields[4].as_ref())?;
        let view_time = parse_view_time(fields[5].as_ref())?;

        Ok(Self::new(stb, title, provider, date, price, view_time))
    }

    /// Rebuild a record from the six lines of a stored record file.
    pub fn reconstruct<S: AsRef<str>>(lines: &[S]) -> Result<Self, ParseError> {
        Self::parse(lines)
    }

    pub fn attribute_as_text(&self, attribute: Attribute) -> String {
        (attribute.spec().render)(self)
    }

    /// The six canonical lines written to the record store.
    pub fn to_lines(&self) -> [String; RECORD_FIELD_COUNT] {
        Attribute::ALL.map(|attribute| self.attribute_as_text(attribute))
    }

    /// `{stb}_{date}_{title}`; records sharing it overwrite each other.
    pub fn storage_key(&self) -> String {
        format!(
            "{}{sep}{}{sep}{}",
            self.stb,
            self.attribute_as_text(Attribute::Date),
            self.title,
            sep = STORAGE_KEY_SEPARATOR
        )
    }

    pub fn stb(&self) -> &str {
        &self.stb
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }
}

fn parse_text(attribute: Attribute, value: &str) -> Result<String, ParseError> {
    if value.trim().is_empty() {
        return Err(ParseError::invalid(attribute, value, "must not be empty"));
    }
    Ok(value.to_string())
}

fn parse_date(value: &str) -> Result<NaiveDate, ParseError> {
    let text = value.trim();
    let date = NaiveDate::parse_from_str(text, DATE_FORMAT)
        .map_err(|e| ParseError::invalid(Attribute::Date, value, e.to_string()))?;

    // chrono accepts unpadded fields and a signed year; only YYYY-MM-DD is valid.
    if date.format(DATE_FORMAT).to_string() != text {
        return Err(ParseError::invalid(Attribute::Date, value, "expected YYYY-MM-DD"));
    }
    Ok(date)
}

fn parse_price(value: &str) -> Result<f64, ParseError> {
    let price: f64 = value
        .trim()
        .parse()
        .map_err(|_| ParseError::invalid(Attribute::Rev, value, "not a number"))?;

    if !price.is_finite() {
        return Err(ParseError::invalid(Attribute::Rev, value, "not a finite number"));
    }
    Ok(price)
}

fn parse_view_time(value: &str) -> Result<NaiveTime, ParseError> {
    let (hour, minute) = value
        .trim()
        .split_once(VIEW_TIME_SEPARATOR)
        .ok_or_else(|| ParseError::invalid(Attribute::ViewTime, value, "expected hour:minute"))?;

    let hour: u32 = hour
        .parse()
        .map_err(|_| ParseError::invalid(Attribute::ViewTime, value, "hour is not an integer"))?;
    let minute: u32 = minute
        .parse()
        .map_err(|_| ParseError::invalid(Attribute::ViewTime, value, "minute is not an integer"))?;

    NaiveTime::from_hms_opt(hour, minute, 0)
        .ok_or_else(|| ParseError::invalid(Attribute::ViewTime, value, "hour or minute out of range"))
}
