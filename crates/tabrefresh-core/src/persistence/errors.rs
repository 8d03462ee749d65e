use crate::errors::RefreshError;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("State store IO error at '{path}': {source}")]
    Io {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize value for key '{key}': {source}")]
    Serialization {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Stored value for key '{key}' has an unexpected shape: {source}")]
    Deserialization {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("State store lock poisoned")]
    LockPoisoned,
}

impl RefreshError for StoreError {
    fn error_code(&self) -> &'static str {
        "store_error"
    }
}
