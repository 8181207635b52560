use thiserror::Error;

/// The locator string carries no recognizable database identifier.
#[derive(Debug, Error)]
#[error("Failed to extract database ID from URL: {locator}")]
pub struct ExtractionError {
    pub locator: String,
}

/// Any failure talking to the Notion API.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("request to Notion failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Notion API error {status} ({code}): {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },
}

impl UpstreamError {
    pub fn status(&self) -> Option<u16> {
        match self {
            UpstreamError::Transport(e) => e.status().map(|s| s.as_u16()),
            UpstreamError::Api { status, .. } => Some(*status),
        }
    }
}

#[derive(Debug, Error)]
pub enum ContentError {
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] tokio_rusqlite::Error),

    #[error("corrupt widget row: {0}")]
    Corrupt(String),
}
