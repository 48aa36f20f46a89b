use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InfraError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Invalid config: {0}")]
    InvalidConfig(String),
    #[error("Invalid coordinate: {0}")]
    InvalidCoordinate(String),
    #[error("Settings error: {0}")]
    Settings(String),
    #[error("Calendar error: {0}")]
    Calendar(String),
    #[error("Notification error: {0}")]
    Notification(#[from] NotificationError),
}

/// Failure of a time oracle. The engine does not distinguish remote variants.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum OracleError {
    #[error("timed out after {seconds}s")]
    Timeout { seconds: u64 },
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("http {status}; body={body}")]
    Status { status: u16, body: String },
    #[error("unparseable payload: {0}")]
    Payload(String),
    #[error("incomplete timings: {0}")]
    IncompleteTimings(String),
    #[error("no solution at latitude {latitude} on {date}")]
    NoSolution { latitude: f64, date: NaiveDate },
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NotificationError {
    #[error("notifications are not authorized")]
    NotAuthorized,
    #[error("failed to register {identifier}: {reason}")]
    Registration { identifier: String, reason: String },
    #[error("notification facility failure: {0}")]
    Facility(String),
}
