use thiserror::Error;

/// Failure talking to the tabular store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),

    /// Network failures, rate limiting and server errors; safe to retry
    #[error("store temporarily unavailable: {0}")]
    Transient(String),

    #[error("store rejected the request: {0}")]
    Rejected(String),

    #[error("unexpected store response: {0}")]
    Malformed(String),

    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Transient(_))
    }
}

/// Failure aggregating one class. Other classes are unaffected.
#[derive(Debug, Error)]
pub enum ClassError {
    #[error("no spreadsheet is configured for {class}")]
    Unconfigured { class: String },

    #[error("failed to read {what} for {class}: {source}")]
    Fetch {
        class: String,
        what: &'static str,
        #[source]
        source: StoreError,
    },

    #[error("failed to write score table for {class}: {source}")]
    Write {
        class: String,
        #[source]
        source: StoreError,
    },
}

/// Failure of the whole aggregation run
#[derive(Debug, Error)]
pub enum RunError {
    #[error("summary spreadsheet id is not configured")]
    SummaryUnconfigured,

    #[error("no classes are configured")]
    NoClasses,

    #[error("invalid configuration: {0}")]
    Config(String),
}
