//! Delimited-text parsing and field normalization.
//!
//! Turns raw price-history text into [`NormalizedRecord`]s. Every header and
//! value is trimmed and loses at most one wrapping quote on each side.
//! Designated numeric columns are coerced to `f64`; a value that fails to
//! parse (or is blank) becomes `0.0` and is tallied in
//! [`ParsedCsv::coerced_fields`] rather than reported as an error.
//!
//! Only structural problems (ragged rows, unreadable input, a header missing
//! a required column) surface as [`ParseError`].

use crate::config::IngestConfig;
use csv::ReaderBuilder;
use std::collections::BTreeMap;

/// Errors that abort parsing of a whole document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Input contained no header line
    MissingHeader,
    /// Header lacks a column the pipeline needs
    MissingColumn(String),
    /// Record shape or encoding was invalid
    Malformed {
        line: Option<u64>,
        message: String,
    },
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::MissingHeader => write!(f, "Input has no header line"),
            ParseError::MissingColumn(column) => {
                write!(f, "Header is missing required column '{}'", column)
            }
            ParseError::Malformed {
                line: Some(line),
                message,
            } => write!(f, "Malformed input at line {}: {}", line, message),
            ParseError::Malformed { line: None, message } => {
                write!(f, "Malformed input: {}", message)
            }
        }
    }
}

impl std::error::Error for ParseError {}

impl From<csv::Error> for ParseError {
    fn from(err: csv::Error) -> Self {
        ParseError::Malformed {
            line: err.position().map(|pos| pos.line()),
            message: err.to_string(),
        }
    }
}

/// One data line after normalization.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedRecord {
    /// Non-numeric columns, normalized but otherwise untouched
    pub text: BTreeMap<String, String>,
    /// Numeric columns, zero-filled where coercion failed
    pub numbers: BTreeMap<String, f64>,
}

impl NormalizedRecord {
    /// Returns a numeric column, or `0.0` if the column is absent.
    pub fn number(&self, column: &str) -> f64 {
        self.numbers.get(column).copied().unwrap_or(0.0)
    }

    pub fn text(&self, column: &str) -> Option<&str> {
        self.text.get(column).map(String::as_str)
    }
}

/// Result of parsing a whole document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedCsv {
    /// Normalized header names, in input order
    pub headers: Vec<String>,
    /// One entry per data line, in input order
    pub records: Vec<NormalizedRecord>,
    /// Numeric fields that were blank or unparseable and fell back to `0.0`
    pub coerced_fields: usize,
}

/// Trims a value and strips at most one leading and one trailing quote.
pub fn normalize_field(value: &str) -> &str {
    let trimmed = value.trim();
    let trimmed = trimmed.strip_prefix('"').unwrap_or(trimmed);
    trimmed.strip_suffix('"').unwrap_or(trimmed)
}

/// Parses the leading number of a normalized field, ignoring any trailing text.
///
/// `"42000.5 USD"` reads as `42000.5` and `"12abc"` as `12`. `None` means no
/// finite number starts the field and the caller should zero-fill.
pub fn coerce_number(value: &str) -> Option<f64> {
    let value = value.trim_start();
    let end = numeric_prefix_len(value.as_bytes());
    if end == 0 {
        return None;
    }
    value[..end].parse::<f64>().ok().filter(|v| v.is_finite())
}

// Length of the longest `[+-]digits[.digits][e[+-]digits]` prefix, or 0 when
// no digit appears in the mantissa.
fn numeric_prefix_len(bytes: &[u8]) -> usize {
    let digits_from = |start: usize| {
        bytes[start..]
            .iter()
            .take_while(|b| b.is_ascii_digit())
            .count()
    };

    let mut pos = 0;
    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        pos += 1;
    }
    let int_digits = digits_from(pos);
    pos += int_digits;

    let mut frac_digits = 0;
    if bytes.get(pos) == Some(&b'.') {
        frac_digits = digits_from(pos + 1);
        if int_digits > 0 || frac_digits > 0 {
            pos += 1 + frac_digits;
        }
    }
    if int_digits == 0 && frac_digits == 0 {
        return 0;
    }

    if matches!(bytes.get(pos), Some(b'e') | Some(b'E')) {
        let mut exp = pos + 1;
        if matches!(bytes.get(exp), Some(b'+') | Some(b'-')) {
            exp += 1;
        }
        let exp_digits = digits_from(exp);
        if exp_digits > 0 {
            pos = exp + exp_digits;
        }
    }
    pos
}

/// Parses delimited text into normalized records.
///
/// # Errors
/// Returns `ParseError` when the header is absent or incomplete, or when a
/// data line has a different number of fields than the header.
pub fn parse_csv_str(text: &str, config: &IngestConfig) -> Result<ParsedCsv, ParseError> {
    let mut reader = ReaderBuilder::new()
        .delimiter(config.delimiter)
        .has_headers(true)
        .flexible(false)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|header| normalize_field(header).to_string())
        .collect();

    if headers.iter().all(|h| h.is_empty()) {
        return Err(ParseError::MissingHeader);
    }

    for required in config.required_columns() {
        if !headers.iter().any(|h| h == required) {
            return Err(ParseError::MissingColumn(required.to_string()));
        }
    }

    let mut parsed = ParsedCsv {
        headers,
        ..ParsedCsv::default()
    };

    for result in reader.records() {
        let record = result?;
        let mut normalized = NormalizedRecord::default();

        for (header, raw) in parsed.headers.iter().zip(record.iter()) {
            let value = normalize_field(raw);
            if config.is_numeric(header) {
                let number = coerce_number(value).unwrap_or_else(|| {
                    parsed.coerced_fields += 1;
                    0.0
                });
                normalized.numbers.insert(header.clone(), number);
            } else {
                normalized.text.insert(header.clone(), value.to_string());
            }
        }

        parsed.records.push(normalized);
    }

    Ok(parsed)
}
