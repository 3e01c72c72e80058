use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Failure taxonomy for the catalog and dialog core.
///
/// `Fetch` and `Extraction` are per-page and usually skippable; `Refresh` is
/// the aggregate failure of a whole catalog update; `Store` covers the
/// durable snapshot file; `Nlu` is per-turn and recoverable; `Configuration`
/// ends the dialog but never the process.
#[derive(Debug, Error)]
pub enum Error {
    #[error("fetch error: {0}")]
    Fetch(String),

    #[error("extraction error: {0}")]
    Extraction(String),

    #[error("catalog refresh failed: {0}")]
    Refresh(String),

    #[error("snapshot store error: {0}")]
    Store(String),

    #[error("language service error: {0}")]
    Nlu(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("operation cancelled")]
    Cancelled,
}

impl Error {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }
}
