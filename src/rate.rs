//! Rate row - one day of reference rates

use crate::error::{RateError, Result};
use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Number of fractional digits kept in computed amounts and averages
pub const RESULT_SCALE: u32 = 2;

/// Reference rates published for a single date
///
/// Maps currency code (case as provided) to its rate. An empty map is valid
/// and means the date exists but carries no usable rates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateRow {
    pub date: NaiveDate,
    pub rates: BTreeMap<String, Decimal>,
}

impl RateRow {
    pub fn new(date: NaiveDate, rates: BTreeMap<String, Decimal>) -> Self {
        Self { date, rates }
    }

    /// Row with no rates
    pub fn empty(date: NaiveDate) -> Self {
        Self::new(date, BTreeMap::new())
    }

    /// Builder-style insert, used mostly in tests and fixtures
    pub fn with_rate(mut self, currency: impl Into<String>, rate: Decimal) -> Self {
        self.rates.insert(currency.into(), rate);
        self
    }

    /// Rate for a currency, if present
    pub fn rate(&self, currency: &str) -> Option<Decimal> {
        self.rates.get(currency).copied()
    }

    pub fn has_currency(&self, currency: &str) -> bool {
        self.rates.contains_key(currency)
    }

    /// Currency codes carried by this row, sorted
    pub fn currencies(&self) -> impl Iterator<Item = &str> {
        self.rates.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }
}

/// Round to two fractional digits, ties away from zero
///
/// The result carries exactly two fractional digits, so `85` becomes `85.00`.
/// Values too large to carry two digits (above `Decimal::MAX / 100`) are an
/// `Arithmetic` error.
pub fn round_half_up(value: Decimal) -> Result<Decimal> {
    let mut rounded =
        value.round_dp_with_strategy(RESULT_SCALE, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(RESULT_SCALE);
    if rounded.scale() != RESULT_SCALE {
        return Err(RateError::Arithmetic(format!(
            "{} is too large to carry {} fractional digits",
            value, RESULT_SCALE
        )));
    }
    Ok(rounded)
}
