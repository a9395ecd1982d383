//! In-memory rate store
//!
//! The store owns one immutable [`RateSnapshot`] at a time. Uploads build a
//! complete row list first and then swap it in; readers clone the current
//! snapshot pointer and keep using it for the rest of their query, so they
//! never see a dataset under construction.

use crate::rate::RateRow;
use chrono::NaiveDate;
use std::sync::{Arc, PoisonError, RwLock};

/// Immutable point-in-time view of the whole dataset
///
/// Cloning is cheap (reference counted). Row order is the order of the
/// upload that produced it, not necessarily chronological.
#[derive(Debug, Clone)]
pub struct RateSnapshot {
    generation: u64,
    rows: Arc<[RateRow]>,
}

impl RateSnapshot {
    pub fn new(generation: u64, rows: Vec<RateRow>) -> Self {
        Self {
            generation,
            rows: rows.into(),
        }
    }

    /// Empty snapshot with generation 0
    pub fn empty() -> Self {
        Self::new(0, Vec::new())
    }

    /// Sequence number of the replace that installed this snapshot
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn rows(&self) -> &[RateRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// First row whose date equals `date`, in snapshot order
    pub fn find_by_date(&self, date: NaiveDate) -> Option<&RateRow> {
        self.rows.iter().find(|row| row.date == date)
    }

    /// Rows with `start <= date <= end`, in snapshot order
    pub fn find_between(&self, start: NaiveDate, end: NaiveDate) -> impl Iterator<Item = &RateRow> {
        self.rows
            .iter()
            .filter(move |row| row.date >= start && row.date <= end)
    }

    /// Earliest and latest dates present
    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        let min = self.rows.iter().map(|row| row.date).min()?;
        let max = self.rows.iter().map(|row| row.date).max()?;
        Some((min, max))
    }
}

impl Default for RateSnapshot {
    fn default() -> Self {
        Self::empty()
    }
}

/// Storage seam used by the query engine
pub trait RateRepository: Send + Sync {
    /// Current snapshot; never partially constructed
    fn snapshot(&self) -> RateSnapshot;

    /// Atomically install `rows` as the new dataset and return it
    fn replace(&self, rows: Vec<RateRow>) -> RateSnapshot;

    /// Exact-date lookup against the current snapshot
    fn find_by_date(&self, date: NaiveDate) -> Option<RateRow> {
        self.snapshot().find_by_date(date).cloned()
    }

    /// Inclusive range lookup against the current snapshot
    fn find_between(&self, start: NaiveDate, end: NaiveDate) -> Vec<RateRow> {
        self.snapshot().find_between(start, end).cloned().collect()
    }
}

/// Rate store holding the current snapshot behind a swap-only lock
///
/// The lock guards a single pointer: writers hold it for the swap and
/// readers for an `Arc` clone. Racing replaces resolve last-write-wins.
#[derive(Debug, Default)]
pub struct InMemoryRateStore {
    current: RwLock<RateSnapshot>,
}

impl InMemoryRateStore {
    /// Empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with an initial dataset (generation 1)
    pub fn with_rows(rows: Vec<RateRow>) -> Self {
        let store = Self::new();
        store.replace(rows);
        store
    }
}

impl RateRepository for InMemoryRateStore {
    fn snapshot(&self) -> RateSnapshot {
        // The guarded value is a pointer and is always consistent, so a
        // poisoned lock is safe to keep using.
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn replace(&self, rows: Vec<RateRow>) -> RateSnapshot {
        let count = rows.len();
        let rows: Arc<[RateRow]> = rows.into();

        let snapshot = {
            let mut current = self
                .current
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            let snapshot = RateSnapshot {
                generation: current.generation + 1,
                rows,
            };
            *current = snapshot.clone();
            snapshot
        };

        log::info!(
            "Installed rate dataset generation {} with {} rows",
            snapshot.generation,
            count
        );
        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn row(d: u32, usd: rust_decimal::Decimal) -> RateRow {
        RateRow::empty(date(2023, 1, d)).with_rate("USD", usd)
    }

    #[test]
    fn test_new_store_is_empty() {
        let store = InMemoryRateStore::new();
        let snapshot = store.snapshot();
        assert!(snapshot.is_empty());
        assert_eq!(snapshot.generation(), 0);
        assert!(store.find_by_date(date(2023, 1, 1)).is_none());
    }

    #[test]
    fn test_replace_and_find() {
        let store = InMemoryRateStore::new();
        let installed = store.replace(vec![row(1, dec!(1.1)), row(2, dec!(1.2))]);

        assert_eq!(installed.generation(), 1);
        assert_eq!(installed.len(), 2);
        assert_eq!(
            store.find_by_date(date(2023, 1, 2)).unwrap().rate("USD"),
            Some(dec!(1.2))
        );
        assert!(store.find_by_date(date(2023, 1, 3)).is_none());
    }

    #[test]
    fn test_old_snapshot_survives_replace() {
        let store = InMemoryRateStore::with_rows(vec![row(1, dec!(1.1))]);
        let old = store.snapshot();

        store.replace(vec![row(5, dec!(2.0)), row(6, dec!(2.1))]);

        assert_eq!(old.len(), 1);
        assert!(old.find_by_date(date(2023, 1, 1)).is_some());
        assert_eq!(store.snapshot().len(), 2);
        assert_eq!(store.snapshot().generation(), 2);
    }

    #[test]
    fn test_find_between_inclusive_and_ordered() {
        let store = InMemoryRateStore::with_rows(vec![
            row(4, dec!(4)),
            row(1, dec!(1)),
            row(3, dec!(3)),
            row(2, dec!(2)),
            row(5, dec!(5)),
        ]);

        let found = store.find_between(date(2023, 1, 2), date(2023, 1, 4));
        let days: Vec<u32> = found.iter().map(|r| chrono::Datelike::day(&r.date)).collect();
        assert_eq!(days, vec![4, 3, 2]);

        let single = store.find_between(date(2023, 1, 5), date(2023, 1, 5));
        assert_eq!(single.len(), 1);
    }

    #[test]
    fn test_duplicate_dates_first_match() {
        let store = InMemoryRateStore::with_rows(vec![row(1, dec!(1.0)), row(1, dec!(9.0))]);
        let found = store.find_by_date(date(2023, 1, 1)).unwrap();
        assert_eq!(found.rate("USD"), Some(dec!(1.0)));
    }

    #[test]
    fn test_date_range() {
        let snapshot = RateSnapshot::new(1, vec![row(3, dec!(1)), row(1, dec!(1)), row(2, dec!(1))]);
        assert_eq!(snapshot.date_range(), Some((date(2023, 1, 1), date(2023, 1, 3))));
        assert_eq!(RateSnapshot::empty().date_range(), None);
    }
}
