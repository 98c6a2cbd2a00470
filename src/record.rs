use std::str::FromStr;
use thiserror::Error;

/// Raw sales lines always carry exactly this many fields. The layout is
/// position-indexed and comes from the upstream exporter, so it's an external
/// contract we validate but can't change: date, store, product, quantity,
/// unit price, unit cost, profit rate, misc.
pub const FIELD_COUNT: usize = 8;

/// Separator set for files coming through the uploader, which historically
/// produced both comma- and semicolon-delimited exports.
pub const UPLOAD_SEPARATORS: &[char] = &[',', ';'];

/// Separator set for files delivered straight by storage events.
pub const EVENT_SEPARATORS: &[char] = &[';'];

/// One validated sales line. Lives just long enough to be folded into the
/// running aggregates; nothing stores these.
#[derive(Debug, Clone, PartialEq)]
pub struct SalesRecord {
    pub store: String,
    pub product: String,
    pub quantity: i64,
    pub unit_price: f64,
    pub profit_rate: f64,
}

impl SalesRecord {
    pub fn total_profit(&self) -> f64 {
        self.profit_rate * self.quantity as f64
    }

    pub fn total_revenue(&self) -> f64 {
        self.unit_price * self.quantity as f64
    }
}

/// Ways a single line can fail validation. None of these are fatal to a
/// batch; the driver logs them and moves on to the next line.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum RecordError {
    #[error("Expected {FIELD_COUNT} fields, found {0}")]
    FieldCount(usize),
    #[error("Field {field:?} does not parse as a number: {value:?}")]
    BadNumber { field: &'static str, value: String },
    #[error("Field {0:?} is empty")]
    EmptyField(&'static str),
}

/// Parses one raw delimited line into a `SalesRecord`. Pure function of its
/// input; the caller decides what to do with rejections. The file header
/// must not be passed here - the driver skips it unconditionally.
pub fn parse_record(line: &str, separators: &[char]) -> Result<SalesRecord, RecordError> {
    let fields: Vec<&str> = line.split(separators).collect();
    if fields.len() != FIELD_COUNT {
        return Err(RecordError::FieldCount(fields.len()));
    }

    let store = fields[1].trim();
    if store.is_empty() {
        return Err(RecordError::EmptyField("store"));
    }
    let product = fields[2].trim();
    if product.is_empty() {
        return Err(RecordError::EmptyField("product"));
    }

    Ok(SalesRecord {
        store: store.to_owned(),
        product: product.to_owned(),
        quantity: parse_number("quantity", fields[3])?,
        unit_price: parse_number("unit price", fields[4])?,
        profit_rate: parse_number("profit rate", fields[6])?,
    })
}

fn parse_number<T: FromStr>(field: &'static str, raw: &str) -> Result<T, RecordError> {
    let raw = raw.trim();
    raw.parse().map_err(|_| RecordError::BadNumber {
        field,
        value: raw.to_owned(),
    })
}
