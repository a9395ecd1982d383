//! Rate service facade
//!
//! Ties the parser, store, query engine and query cache together behind the
//! operations a transport layer calls: upload, replace, lookup, convert and
//! the two range aggregates.

use crate::cache::{CacheStats, QueryCache, QueryKey, QueryValue};
use crate::config::{ServiceConfig, UploadConfig};
use crate::engine::RateQueryEngine;
use crate::error::{RateError, Result};
use crate::parser;
use crate::rate::RateRow;
use crate::store::{InMemoryRateStore, RateRepository, RateSnapshot};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::fs;
use std::path::Path;
use std::sync::Arc;

/// A CSV file as received by the transport
#[derive(Debug, Clone, Copy)]
pub struct CsvUpload<'a> {
    /// Declared content type, e.g. `text/csv`
    pub content_type: Option<&'a str>,
    pub file_name: Option<&'a str>,
    pub bytes: &'a [u8],
}

impl<'a> CsvUpload<'a> {
    pub fn new(content_type: Option<&'a str>, bytes: &'a [u8]) -> Self {
        Self {
            content_type,
            file_name: None,
            bytes,
        }
    }

    pub fn with_file_name(mut self, file_name: &'a str) -> Self {
        self.file_name = Some(file_name);
        self
    }
}

/// Reject ranges whose end is before their start
pub fn validate_range(start: NaiveDate, end: NaiveDate) -> Result<()> {
    if end < start {
        return Err(RateError::InvalidRange { start, end });
    }
    Ok(())
}

pub struct RateService {
    engine: RateQueryEngine,
    cache: QueryCache,
    upload: UploadConfig,
}

impl RateService {
    /// Service over an existing repository
    pub fn new(repository: Arc<dyn RateRepository>, config: &ServiceConfig) -> Self {
        Self {
            engine: RateQueryEngine::with_policy(repository, config.average_policy),
            cache: QueryCache::new(config.cache),
            upload: config.upload.clone(),
        }
    }

    /// Service over a fresh in-memory store, seeded from `default_dataset`
    pub fn from_config(config: &ServiceConfig) -> Result<Self> {
        let service = Self::new(Arc::new(InMemoryRateStore::new()), config);
        if let Some(path) = config.default_dataset.as_deref() {
            service.load_file(path)?;
        }
        Ok(service)
    }

    /// Parse a CSV file from disk and install it
    pub fn load_file(&self, path: &Path) -> Result<RateSnapshot> {
        let bytes = fs::read(path)?;
        let rows = self.parse_csv(&bytes).map_err(|e| match e {
            RateError::Parsing(msg) => RateError::Parsing(format!("{}: {}", path.display(), msg)),
            other => other,
        })?;
        log::info!("Loading {} rate rows from {}", rows.len(), path.display());
        Ok(self.replace_dataset(rows))
    }

    pub fn parse_csv(&self, bytes: &[u8]) -> Result<Vec<RateRow>> {
        parser::parse_csv(bytes)
    }

    /// Install `rows` as the dataset and drop every cached result
    pub fn replace_dataset(&self, rows: Vec<RateRow>) -> RateSnapshot {
        let snapshot = self.engine.repository().replace(rows);
        self.cache.invalidate(snapshot.generation());
        snapshot
    }

    /// Check content type and size before the payload reaches the parser
    pub fn validate_upload(&self, upload: &CsvUpload<'_>) -> Result<()> {
        let allowed = upload.content_type.map_or(false, |ct| {
            self.upload
                .allowed_content_types
                .iter()
                .any(|allowed| allowed.eq_ignore_ascii_case(ct))
        });
        if !allowed {
            return Err(RateError::UploadRejected(
                "Invalid file or file format. Only CSV files are allowed.".to_string(),
            ));
        }
        if upload.bytes.is_empty() {
            return Err(RateError::UploadRejected(
                "Empty csv file is not allowed.".to_string(),
            ));
        }
        if upload.bytes.len() > self.upload.max_bytes {
            return Err(RateError::UploadRejected(format!(
                "CSV file of {} bytes exceeds the {} byte limit",
                upload.bytes.len(),
                self.upload.max_bytes
            )));
        }
        Ok(())
    }

    /// Validate, parse and install an uploaded file
    ///
    /// Any failure leaves the current dataset untouched.
    pub fn upload_csv(&self, upload: &CsvUpload<'_>) -> Result<RateSnapshot> {
        let name = upload.file_name.unwrap_or("<upload>");
        let rows = self
            .validate_upload(upload)
            .and_then(|_| self.parse_csv(upload.bytes))
            .map_err(|e| {
                log::warn!("Rejected rate upload {}: {}", name, e);
                e
            })?;
        Ok(self.replace_dataset(rows))
    }

    pub fn current_dataset(&self) -> RateSnapshot {
        self.engine.snapshot()
    }

    pub fn get_by_date(&self, date: NaiveDate) -> Result<RateRow> {
        let snapshot = self.engine.snapshot();
        let key = QueryKey::RatesByDate(date);
        if let Some(QueryValue::Row(row)) = self.cache.get(snapshot.generation(), &key) {
            return Ok(row);
        }

        let row = self.engine.rates_by_date_in(&snapshot, date)?;
        self.cache
            .insert(snapshot.generation(), key, QueryValue::Row(row.clone()));
        Ok(row)
    }

    pub fn convert(
        &self,
        date: NaiveDate,
        source: &str,
        target: &str,
        amount: Decimal,
    ) -> Result<Decimal> {
        let key = QueryKey::Convert {
            date,
            source: source.to_string(),
            target: target.to_string(),
            amount,
        };
        self.cached_amount(key, |engine, snapshot| {
            engine.convert_in(snapshot, date, source, target, amount)
        })
    }

    pub fn highest(&self, start: NaiveDate, end: NaiveDate, currency: &str) -> Result<Decimal> {
        validate_range(start, end)?;
        let key = QueryKey::Highest {
            start,
            end,
            currency: currency.to_string(),
        };
        self.cached_amount(key, |engine, snapshot| {
            engine.highest_exchange_rate_in(snapshot, start, end, currency)
        })
    }

    pub fn average(&self, start: NaiveDate, end: NaiveDate, currency: &str) -> Result<Decimal> {
        validate_range(start, end)?;
        let key = QueryKey::Average {
            start,
            end,
            currency: currency.to_string(),
        };
        self.cached_amount(key, |engine, snapshot| {
            engine.average_exchange_rate_in(snapshot, start, end, currency)
        })
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    fn cached_amount<F>(&self, key: QueryKey, compute: F) -> Result<Decimal>
    where
        F: FnOnce(&RateQueryEngine, &RateSnapshot) -> Result<Decimal>,
    {
        let snapshot = self.engine.snapshot();
        if let Some(QueryValue::Amount(amount)) = self.cache.get(snapshot.generation(), &key) {
            return Ok(amount);
        }

        let amount = compute(&self.engine, &snapshot)?;
        self.cache
            .insert(snapshot.generation(), key, QueryValue::Amount(amount));
        Ok(amount)
    }
}
