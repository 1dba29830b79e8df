//! Shared error types for the services crate.

use thiserror::Error;

use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by `LedgerService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LedgerError {
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `SettingsService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SettingsError {
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by practice sessions.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PracticeError {
    #[error("no questions available for this session")]
    Empty,
    #[error("exam mode is driven by the exam controller")]
    ExamMode,
    #[error("question {number} is outside 1..={total}")]
    OutOfRange { number: usize, total: usize },
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Errors emitted by `ExamController`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ExamError {
    #[error("no questions available for this exam")]
    Empty,
    #[error("exam already running")]
    AlreadyRunning,
    #[error("exam already submitted; restart or close it first")]
    AlreadySubmitted,
    #[error("exam is not running")]
    NotRunning,
    #[error("question index {index} is outside 0..{total}")]
    OutOfRange { index: usize, total: usize },
}

/// Errors emitted while loading the question bank.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuestionBankError {
    #[error("no question sources configured")]
    NoSources,
    #[error("all {attempted} question files failed to load")]
    AllSourcesFailed { attempted: usize },
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("question bank is not a JSON array: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid question source url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("question source {url} answered with status {status}")]
    HttpStatus {
        url: String,
        status: reqwest::StatusCode,
    },
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Errors emitted by `TransferService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TransferError {
    #[error("invalid import document: {0}")]
    InvalidFormat(String),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("invalid import url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("import request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
