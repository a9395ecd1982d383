//! Memoization of query results
//!
//! Results are keyed by operation and arguments and tagged with the
//! generation of the snapshot they were computed on. A lookup only hits when
//! the caller's snapshot has the same generation, so nothing computed on an
//! old dataset is returned after a replace, even if the replace races a
//! query that is still filling the cache.

use crate::rate::RateRow;
use chrono::NaiveDate;
use hashbrown::HashMap;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

/// Operation plus arguments
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryKey {
    RatesByDate(NaiveDate),
    Convert {
        date: NaiveDate,
        source: String,
        target: String,
        amount: Decimal,
    },
    Highest {
        start: NaiveDate,
        end: NaiveDate,
        currency: String,
    },
    Average {
        start: NaiveDate,
        end: NaiveDate,
        currency: String,
    },
}

/// Cached result of a successful query
#[derive(Debug, Clone, PartialEq)]
pub enum QueryValue {
    Row(RateRow),
    Amount(Decimal),
}

/// Cache settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    /// Entries kept per generation before the cache is emptied
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: 1024,
        }
    }
}

/// Hit/miss counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
    pub generation: u64,
}

#[derive(Debug, Default)]
struct CacheState {
    generation: u64,
    entries: HashMap<QueryKey, QueryValue>,
}

/// Generation-tagged query cache
#[derive(Debug)]
pub struct QueryCache {
    config: CacheConfig,
    state: Mutex<CacheState>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl QueryCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            state: Mutex::new(CacheState::default()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled && self.config.max_entries > 0
    }

    /// Cached value for `key` computed on a snapshot of `generation`
    pub fn get(&self, generation: u64, key: &QueryKey) -> Option<QueryValue> {
        if !self.is_enabled() {
            return None;
        }

        let found = {
            let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            if state.generation == generation {
                state.entries.get(key).cloned()
            } else {
                None
            }
        };

        match found {
            Some(value) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(value)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Store a result computed on a snapshot of `generation`
    ///
    /// Results from a generation older than the newest one seen are dropped.
    pub fn insert(&self, generation: u64, key: QueryKey, value: QueryValue) {
        if !self.is_enabled() {
            return;
        }

        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if generation < state.generation {
            return;
        }
        if generation > state.generation {
            state.generation = generation;
            state.entries.clear();
        }
        if state.entries.len() >= self.config.max_entries {
            log::debug!(
                "Query cache full at {} entries, clearing",
                state.entries.len()
            );
            state.entries.clear();
        }
        state.entries.insert(key, value);
    }

    /// Drop every entry and refuse results older than `generation`
    pub fn invalidate(&self, generation: u64) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let dropped = state.entries.len();
        state.entries.clear();
        state.generation = state.generation.max(generation);
        log::debug!(
            "Query cache invalidated for generation {} ({} entries dropped)",
            state.generation,
            dropped
        );
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: state.entries.len(),
            generation: state.generation,
        }
    }
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}
