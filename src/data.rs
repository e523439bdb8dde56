use std::{fmt, io::Read};

use anyhow::{Context, Result, bail};
use encoding_rs::Encoding;
use log::debug;
use serde::{Serialize, Serializer};

use crate::{error::PipelineError, io_utils, normalize};

/// A cell after coercion. Missing cells are carried as `None` alongside
/// `Option<Value>` rows, never as a variant.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f64),
    Text(String),
}

impl Value {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Text(_) => None,
        }
    }

    pub fn as_display(&self) -> String {
        match self {
            Value::Number(n) => format_number(*n),
            Value::Text(s) => s.clone(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_display())
    }
}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Value::Number(n) => serializer.serialize_f64(*n),
            Value::Text(s) => serializer.serialize_str(s),
        }
    }
}

/// Integral values print without a fractional part, everything else keeps
/// up to four decimals with trailing zeros trimmed.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.0}")
    } else {
        let rendered = format!("{value:.4}");
        rendered
            .trim_end_matches('0')
            .trim_end_matches('.')
            .to_string()
    }
}

/// Cell values read as "no value": the default NA set of common dataframe
/// loaders. Matching is case-sensitive. Surrounding whitespace is ignored,
/// so a blank cell is missing too. Anything else, `-` and `Unknown`
/// included, is a real value.
pub const MISSING_TOKENS: [&str; 18] = [
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

pub fn is_missing_token(raw: &str) -> bool {
    let trimmed = raw.trim();
    trimmed.is_empty() || MISSING_TOKENS.contains(&trimmed)
}

/// Permissive numeric parse: anything that is not a finite number is
/// reported as missing instead of failing.
pub fn parse_numeric(raw: &str) -> Option<f64> {
    if is_missing_token(raw) {
        return None;
    }
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}

/// Rows exactly as read, with canonical column names alongside the raw
/// headers they came from.
#[derive(Debug, Clone)]
pub struct RawDataset {
    pub raw_headers: Vec<String>,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawDataset {
    pub fn from_reader<R: Read>(
        reader: &mut csv::Reader<R>,
        encoding: &'static Encoding,
    ) -> Result<Self> {
        let raw_headers = io_utils::reader_headers(reader, encoding)?;
        if raw_headers.is_empty() {
            return Err(PipelineError::EmptyHeader.into());
        }
        let columns = normalize::normalize_headers(&raw_headers);
        let width = columns.len();
        let mut rows = Vec::new();
        for (row_idx, record) in reader.byte_records().enumerate() {
            let line = row_idx + 2;
            let record = record.with_context(|| format!("Reading row {line}"))?;
            if record.len() > width {
                bail!(
                    "Reading row {line}: found {} fields but the header has {width}",
                    record.len()
                );
            }
            let mut decoded = io_utils::decode_record(&record, encoding)
                .with_context(|| format!("Decoding row {line}"))?;
            if decoded.len() < width {
                // absent trailing cells read as empty, like a blank field
                debug!("Row {line} has {} of {width} fields; padding", decoded.len());
                decoded.resize(width, String::new());
            }
            rows.push(decoded);
        }
        Ok(Self {
            raw_headers,
            columns,
            rows,
        })
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}
