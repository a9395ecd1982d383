//! CSV parser for daily reference rate files
//!
//! Expected layout:
//!
//! ```text
//! date,USD,JPY,BGN
//! 2023-01-02,1.0683,140.66,1.9558
//! 2023-01-03,1.0545,N/A,1.9558
//! ```
//!
//! The header row names the currencies; column 0 of every data row is the
//! date. Shape problems, bad dates and numbers too large or too precise to
//! store exactly fail the whole file, while cells that are not numbers are
//! skipped for that row only.

use crate::error::{RateError, Result};
use crate::rate::RateRow;
use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord, Trim};
use hashbrown::HashSet;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::io::Read;

/// Date format of column 0
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse raw CSV bytes into rate rows, preserving data-row order
pub fn parse_csv(bytes: &[u8]) -> Result<Vec<RateRow>> {
    parse_reader(bytes)
}

/// Parse CSV from any reader (file, upload body, ...)
pub fn parse_reader<R: Read>(reader: R) -> Result<Vec<RateRow>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::None)
        .from_reader(reader);

    let mut records = Vec::new();
    for result in rdr.records() {
        let record = result.map_err(|e| {
            RateError::Parsing(format!("Error occurred while parsing the CSV file: {}", e))
        })?;
        records.push(record);
    }

    let (header, data) = records
        .split_first()
        .ok_or_else(|| RateError::Parsing("CSV file is empty".to_string()))?;

    if header.len() < 2 {
        return Err(RateError::Parsing(
            "CSV file must have at least 2 columns".to_string(),
        ));
    }

    let mut rows = Vec::with_capacity(data.len());
    let mut seen = HashSet::with_capacity(data.len());

    for record in data {
        let row = parse_row(header, record)?;
        if !seen.insert(row.date) {
            log::warn!("Duplicate rate row for {}; lookups use the first one", row.date);
        }
        rows.push(row);
    }

    log::debug!(
        "Parsed {} rate rows across {} currency columns",
        rows.len(),
        header.len() - 1
    );

    Ok(rows)
}

fn parse_row(header: &StringRecord, record: &StringRecord) -> Result<RateRow> {
    let date_str = record.get(0).unwrap_or_default();
    let date = parse_date(date_str)?;

    let mut rates = BTreeMap::new();
    for (i, cell) in record.iter().enumerate().skip(1) {
        let currency = header.get(i).unwrap_or_default();
        if currency.trim().is_empty() {
            continue;
        }

        match parse_rate(cell) {
            Ok(Some(rate)) => {
                rates.insert(currency.to_string(), rate);
            }
            Ok(None) => log::debug!("Skipping {} on {}: `{}` is not a number", currency, date, cell),
            Err(e) => {
                let msg = format!("Unable to store {} on {}: {}", currency, date, e);
                log::warn!("{}", msg);
                return Err(RateError::Parsing(msg));
            }
        }
    }

    Ok(RateRow::new(date, rates))
}

/// Parse a `YYYY-MM-DD` date
pub fn parse_date(value: &str) -> Result<NaiveDate> {
    // chrono accepts single-digit months and days; the file format does not
    let well_formed = value.len() == 10
        && value
            .char_indices()
            .all(|(i, c)| if i == 4 || i == 7 { c == '-' } else { c.is_ascii_digit() });

    let parsed = if well_formed {
        NaiveDate::parse_from_str(value, DATE_FORMAT).ok()
    } else {
        None
    };

    parsed.ok_or_else(|| {
        let msg = format!("Unable to parse CSV date `{}`: expected YYYY-MM-DD", value);
        log::warn!("{}", msg);
        RateError::Parsing(msg)
    })
}

/// Most fractional digits a stored rate can carry
const MAX_SCALE: usize = 28;

/// Digits of `Decimal::MAX`
const MAX_INT_DIGITS: i64 = 29;

/// Parse a rate cell
///
/// `Ok(None)` when the cell is not a decimal literal (`N/A`, blank, `1_000`,
/// `0x1F`). A literal that cannot be held exactly, because it is too large
/// or too precise, is an error rather than a silently altered value.
pub fn parse_rate(value: &str) -> Result<Option<Decimal>> {
    let literal = match DecimalLiteral::parse(value) {
        Some(literal) => literal,
        None => return Ok(None),
    };

    literal.to_decimal().map(Some).ok_or_else(|| {
        RateError::Parsing(format!(
            "Rate `{}` cannot be represented exactly (at most {} fractional digits and a magnitude up to {})",
            value,
            MAX_SCALE,
            Decimal::MAX
        ))
    })
}

/// `[+-]digits[.digits][(e|E)[+-]digits]`, at least one significand digit
struct DecimalLiteral<'a> {
    negative: bool,
    int_digits: &'a str,
    frac_digits: &'a str,
    exponent: i64,
}

impl<'a> DecimalLiteral<'a> {
    fn parse(value: &'a str) -> Option<Self> {
        let (negative, unsigned) = match value.as_bytes().first()? {
            b'-' => (true, &value[1..]),
            b'+' => (false, &value[1..]),
            _ => (false, value),
        };

        let (significand, exponent) = match unsigned.find(['e', 'E']) {
            Some(pos) => (&unsigned[..pos], Some(&unsigned[pos + 1..])),
            None => (unsigned, None),
        };

        let (int_digits, frac_digits) = match significand.split_once('.') {
            Some((int, frac)) => (int, frac),
            None => (significand, ""),
        };

        let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
        if (int_digits.is_empty() && frac_digits.is_empty())
            || !all_digits(int_digits)
            || !all_digits(frac_digits)
        {
            return None;
        }

        let exponent = match exponent {
            Some(exp) => {
                let digits = exp.strip_prefix(['+', '-']).unwrap_or(exp);
                if digits.is_empty() || !all_digits(digits) {
                    return None;
                }
                // out-of-range exponents are still numbers, just unrepresentable
                exp.parse::<i64>().unwrap_or(if exp.starts_with('-') {
                    i64::MIN
                } else {
                    i64::MAX
                })
            }
            None => 0,
        };

        Some(Self {
            negative,
            int_digits,
            frac_digits,
            exponent,
        })
    }

    /// Exact value, `None` when it does not fit a `Decimal` unchanged
    fn to_decimal(&self) -> Option<Decimal> {
        let all = format!("{}{}", self.int_digits, self.frac_digits);
        let digits = all.trim_start_matches('0');
        if digits.is_empty() {
            return Some(Decimal::ZERO);
        }

        // decimal point position within `digits` once the exponent is applied
        let leading = (all.len() - digits.len()) as i64;
        let point = (self.int_digits.len() as i64)
            .checked_add(self.exponent)?
            .checked_sub(leading)?;
        if point > MAX_INT_DIGITS || point < -(MAX_SCALE as i64) {
            return None;
        }

        let len = digits.len() as i64;
        let (int_part, frac_part) = if point <= 0 {
            ("0".to_string(), format!("{}{}", "0".repeat((-point) as usize), digits))
        } else if point >= len {
            (format!("{}{}", digits, "0".repeat((point - len) as usize)), String::new())
        } else {
            let (int, frac) = digits.split_at(point as usize);
            (int.to_string(), frac.to_string())
        };

        let frac_part = if frac_part.len() > MAX_SCALE {
            frac_part.trim_end_matches('0')
        } else {
            frac_part.as_str()
        };
        if frac_part.len() > MAX_SCALE {
            return None;
        }

        let sign = if self.negative { "-" } else { "" };
        let plain = if frac_part.is_empty() {
            format!("{}{}", sign, int_part)
        } else {
            format!("{}{}.{}", sign, int_part, frac_part)
        };
        Decimal::from_str_exact(&plain).ok()
    }
}
