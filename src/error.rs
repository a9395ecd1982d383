//! Error types for rusty_fxrates

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Main error type for rate parsing, storage and queries
#[derive(Error, Debug)]
pub enum RateError {
    #[error("{0}")]
    Parsing(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Invalid date range: Start date `{start}` should not be greater than End date `{end}`")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    #[error("{0}")]
    UploadRejected(String),

    #[error("Arithmetic error: {0}")]
    Arithmetic(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl RateError {
    /// Machine-readable kind of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            RateError::Parsing(_) => ErrorKind::CsvParsing,
            RateError::NotFound(_) => ErrorKind::CurrencyRateNotFound,
            RateError::InvalidRange { .. } => ErrorKind::InvalidDateRange,
            RateError::UploadRejected(_) => ErrorKind::InvalidCsvFile,
            RateError::Arithmetic(_)
            | RateError::Config(_)
            | RateError::Io(_)
            | RateError::Serde(_) => ErrorKind::ServerError,
        }
    }

    /// Build a serializable report for a transport layer
    pub fn report(&self) -> ErrorReport {
        ErrorReport::new(self.kind(), vec![self.to_string()])
    }
}

/// Result type alias for rusty_fxrates operations
pub type Result<T> = std::result::Result<T, RateError>;

/// Error kind tag used by callers to dispatch on failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    CurrencyRateNotFound,
    #[serde(rename = "INVALID_DATE_RANGE_ERROR")]
    InvalidDateRange,
    #[serde(rename = "INVALID_CSV_FILE_ERROR")]
    InvalidCsvFile,
    #[serde(rename = "CSV_PARSING_ERROR")]
    CsvParsing,
    ServerError,
}

impl ErrorKind {
    /// Suggested HTTP status for a transport wrapping the core
    pub fn http_status(&self) -> u16 {
        match self {
            ErrorKind::CurrencyRateNotFound => 404,
            ErrorKind::InvalidDateRange | ErrorKind::InvalidCsvFile | ErrorKind::CsvParsing => 400,
            ErrorKind::ServerError => 500,
        }
    }
}

/// Prints the wire name given by the serde attributes
impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match serde_json::to_value(self) {
            Ok(serde_json::Value::String(name)) => f.write_str(&name),
            _ => Err(fmt::Error),
        }
    }
}

/// Error body handed to whatever transport wraps the service
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorReport {
    pub error_code: ErrorKind,
    pub error_messages: Vec<String>,
    pub error_reference_id: Uuid,
    /// ISO local date-time in UTC
    pub timestamp: String,
}

impl ErrorReport {
    pub fn new(error_code: ErrorKind, error_messages: Vec<String>) -> Self {
        Self {
            error_code,
            error_messages,
            error_reference_id: Uuid::new_v4(),
            timestamp: Utc::now().naive_utc().format("%Y-%m-%dT%H:%M:%S%.f").to_string(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        assert_eq!(RateError::Parsing("x".into()).kind(), ErrorKind::CsvParsing);
        assert_eq!(RateError::NotFound("x".into()).kind(), ErrorKind::CurrencyRateNotFound);
        assert_eq!(
            RateError::UploadRejected("x".into()).kind(),
            ErrorKind::InvalidCsvFile
        );
        assert_eq!(RateError::Arithmetic("x".into()).kind(), ErrorKind::ServerError);
    }

    #[test]
    fn test_http_status() {
        assert_eq!(ErrorKind::CurrencyRateNotFound.http_status(), 404);
        assert_eq!(ErrorKind::CsvParsing.http_status(), 400);
        assert_eq!(ErrorKind::InvalidDateRange.http_status(), 400);
        assert_eq!(ErrorKind::ServerError.http_status(), 500);
    }

    #[test]
    fn test_display_matches_wire_name() {
        let kinds = [
            (ErrorKind::CurrencyRateNotFound, "CURRENCY_RATE_NOT_FOUND"),
            (ErrorKind::InvalidDateRange, "INVALID_DATE_RANGE_ERROR"),
            (ErrorKind::InvalidCsvFile, "INVALID_CSV_FILE_ERROR"),
            (ErrorKind::CsvParsing, "CSV_PARSING_ERROR"),
            (ErrorKind::ServerError, "SERVER_ERROR"),
        ];
        for (kind, name) in kinds {
            assert_eq!(kind.to_string(), name);
            assert_eq!(serde_json::to_string(&kind).unwrap(), format!("\"{}\"", name));
            assert_eq!(serde_json::from_str::<ErrorKind>(&format!("\"{}\"", name)).unwrap(), kind);
        }
    }

    #[test]
    fn test_invalid_range_message() {
        let err = RateError::InvalidRange {
            start: NaiveDate::from_ymd_opt(2023, 1, 5).unwrap(),
            end: NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid date range: Start date `2023-01-05` should not be greater than End date `2023-01-01`"
        );
    }

    #[test]
    fn test_report_json() {
        let report = RateError::NotFound("no rates".into()).report();
        let json = report.to_json().unwrap();
        assert!(json.contains("\"errorCode\":\"CURRENCY_RATE_NOT_FOUND\""));
        assert!(json.contains("no rates"));
        assert!(json.contains("errorReferenceId"));
    }
}
