//! Rate query engine
//!
//! Date lookup, conversion and range aggregates over the rate store. Each
//! public query fetches one snapshot and runs entirely against it; the
//! `*_in` variants take the snapshot explicitly so callers (the query cache)
//! can pin the dataset they key results on.

use crate::error::{RateError, Result};
use crate::rate::{round_half_up, RateRow};
use crate::store::{RateRepository, RateSnapshot};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// When an average query counts as "not found"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AveragePolicy {
    /// Only when no row in range carries the currency
    #[default]
    RejectEmpty,
    /// Also when the rounded average is zero or negative
    RejectNonPositive,
}

/// Query engine over an injected rate repository
pub struct RateQueryEngine {
    repository: Arc<dyn RateRepository>,
    average_policy: AveragePolicy,
}

impl RateQueryEngine {
    /// Create engine with the default average policy
    pub fn new(repository: Arc<dyn RateRepository>) -> Self {
        Self::with_policy(repository, AveragePolicy::default())
    }

    pub fn with_policy(repository: Arc<dyn RateRepository>, average_policy: AveragePolicy) -> Self {
        Self {
            repository,
            average_policy,
        }
    }

    /// Current dataset snapshot
    pub fn snapshot(&self) -> RateSnapshot {
        self.repository.snapshot()
    }

    pub fn repository(&self) -> &Arc<dyn RateRepository> {
        &self.repository
    }

    /// All rates published for `date`
    pub fn rates_by_date(&self, date: NaiveDate) -> Result<RateRow> {
        self.rates_by_date_in(&self.snapshot(), date)
    }

    pub fn rates_by_date_in(&self, snapshot: &RateSnapshot, date: NaiveDate) -> Result<RateRow> {
        snapshot
            .find_by_date(date)
            .cloned()
            .ok_or_else(|| date_not_found(date))
    }

    /// Convert `amount` of `source` into `target` using the rates of `date`
    ///
    /// `amount * target_rate / source_rate`, rounded half-up to 2 places.
    pub fn convert(
        &self,
        date: NaiveDate,
        source: &str,
        target: &str,
        amount: Decimal,
    ) -> Result<Decimal> {
        self.convert_in(&self.snapshot(), date, source, target, amount)
    }

    pub fn convert_in(
        &self,
        snapshot: &RateSnapshot,
        date: NaiveDate,
        source: &str,
        target: &str,
        amount: Decimal,
    ) -> Result<Decimal> {
        let row = snapshot.find_by_date(date).ok_or_else(|| date_not_found(date))?;

        let (source_rate, target_rate) = match (row.rate(source), row.rate(target)) {
            (Some(s), Some(t)) => (s, t),
            _ => {
                return Err(RateError::NotFound(format!(
                    "Currency rates not available for the specified currencies source currency `{}` and target currency `{}`",
                    source, target
                )))
            }
        };

        if source_rate.is_zero() {
            return Err(RateError::Arithmetic(format!(
                "Rate of `{}` on {} is zero",
                source, date
            )));
        }

        let converted = amount
            .checked_mul(target_rate)
            .and_then(|scaled| scaled.checked_div(source_rate))
            .ok_or_else(|| {
                RateError::Arithmetic(format!(
                    "Overflow converting {} {} to {} on {}",
                    amount, source, target, date
                ))
            })?;

        round_half_up(converted)
    }

    /// Highest rate of `currency` between `start` and `end` inclusive
    pub fn highest_exchange_rate(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        currency: &str,
    ) -> Result<Decimal> {
        self.highest_exchange_rate_in(&self.snapshot(), start, end, currency)
    }

    pub fn highest_exchange_rate_in(
        &self,
        snapshot: &RateSnapshot,
        start: NaiveDate,
        end: NaiveDate,
        currency: &str,
    ) -> Result<Decimal> {
        snapshot
            .find_between(start, end)
            .filter_map(|row| row.rate(currency))
            .max()
            .ok_or_else(|| range_not_found(currency))
    }

    /// Mean rate of `currency` between `start` and `end` inclusive
    ///
    /// Rows without the currency are skipped, not counted as zero. The mean
    /// is computed exactly and rounded half-up to 2 places at the end.
    pub fn average_exchange_rate(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        currency: &str,
    ) -> Result<Decimal> {
        self.average_exchange_rate_in(&self.snapshot(), start, end, currency)
    }

    pub fn average_exchange_rate_in(
        &self,
        snapshot: &RateSnapshot,
        start: NaiveDate,
        end: NaiveDate,
        currency: &str,
    ) -> Result<Decimal> {
        let values: Vec<Decimal> = snapshot
            .find_between(start, end)
            .filter_map(|row| row.rate(currency))
            .collect();

        if values.is_empty() {
            return Err(range_not_found(currency));
        }

        let sum = values
            .iter()
            .try_fold(Decimal::ZERO, |acc, v| acc.checked_add(*v))
            .ok_or_else(|| {
                RateError::Arithmetic(format!("Overflow summing rates of `{}`", currency))
            })?;

        let mean = sum
            .checked_div(Decimal::from(values.len()))
            .ok_or_else(|| {
                RateError::Arithmetic(format!("Overflow averaging rates of `{}`", currency))
            })?;
        let average = round_half_up(mean)?;

        if self.average_policy == AveragePolicy::RejectNonPositive && average <= Decimal::ZERO {
            return Err(range_not_found(currency));
        }

        Ok(average)
    }
}

fn date_not_found(date: NaiveDate) -> RateError {
    RateError::NotFound(format!(
        "Currency rates not available for the specified date `{}`",
        date
    ))
}

fn range_not_found(currency: &str) -> RateError {
    RateError::NotFound(format!(
        "No currency rates available for the specified date range and currency `{}`",
        currency
    ))
}
