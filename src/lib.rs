//! # rusty_fxrates
//!
//! Daily reference exchange rates held in memory: CSV ingestion, date
//! lookup, cross-rate conversion and range aggregates.
//!
//! The dataset is replaced wholesale by uploads. Each replacement installs a
//! new immutable snapshot, so queries running at the same time keep a
//! consistent view and a rejected upload never disturbs the current data.
//!
//! ## Example
//!
//! ```rust
//! use rusty_fxrates::prelude::*;
//! use chrono::NaiveDate;
//! use rust_decimal::Decimal;
//!
//! let service = RateService::from_config(&ServiceConfig::default()).unwrap();
//! let csv = "date,USD,EUR\n2023-01-01,1.0,0.85\n";
//! service
//!     .upload_csv(&CsvUpload::new(Some("text/csv"), csv.as_bytes()))
//!     .unwrap();
//!
//! let date = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
//! let eur = service.convert(date, "USD", "EUR", Decimal::from(100)).unwrap();
//! assert_eq!(eur.to_string(), "85.00");
//! ```

pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod parser;
pub mod rate;
pub mod service;
pub mod store;

pub mod prelude {
    //! Commonly used types and traits
    pub use crate::cache::{CacheConfig, CacheStats, QueryCache};
    pub use crate::config::{ServiceConfig, UploadConfig};
    pub use crate::engine::{AveragePolicy, RateQueryEngine};
    pub use crate::error::{ErrorKind, ErrorReport, RateError, Result};
    pub use crate::parser::parse_csv;
    pub use crate::rate::{round_half_up, RateRow};
    pub use crate::service::{validate_range, CsvUpload, RateService};
    pub use crate::store::{InMemoryRateStore, RateRepository, RateSnapshot};
}
