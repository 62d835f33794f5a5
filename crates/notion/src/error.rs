/// Failures talking to the content-service REST API.
#[derive(Debug, thiserror::Error)]
pub enum NotionError {
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API returned {status} ({code}): {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    #[error("Invalid API token")]
    InvalidToken,

    #[error("Unexpected response: {0}")]
    Decode(String),
}

impl From<NotionError> for notiblog_core::Error {
    fn from(err: NotionError) -> Self {
        notiblog_core::Error::Http(err.to_string())
    }
}
