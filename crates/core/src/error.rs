use std::path::PathBuf;

/// Errors shared by every notiblog crate.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration parse error: {0}")]
    ConfigParse(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// A leading metadata block could not be interpreted.
    #[error("Malformed metadata in page {page_id}: {message}")]
    Metadata { page_id: String, message: String },

    #[error("Malformed date '{value}' in page {page_id}")]
    Date { page_id: String, value: String },

    #[error("Page {0} is not in the cache")]
    NotCached(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Failed to render {url}: {message}")]
    Render { url: String, message: String },

    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::ConfigParse(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_includes_context() {
        let err = Error::Date {
            page_id: "abc".to_string(),
            value: "yesterday".to_string(),
        };
        assert_eq!(err.to_string(), "Malformed date 'yesterday' in page abc");

        let err = Error::NotCached("0123".to_string());
        assert!(err.to_string().contains("0123"));
    }

    #[test]
    fn test_toml_error_becomes_config_parse() {
        let err: Error = toml::from_str::<toml::Value>("= broken").unwrap_err().into();
        assert!(matches!(err, Error::ConfigParse(_)));
    }
}
