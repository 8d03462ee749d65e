use std::error::Error;

/// Base trait for all core errors.
pub trait RefreshError: Error + Send + Sync + 'static {
    /// Error code for programmatic handling. Matches the wire `ErrorCode`.
    fn error_code(&self) -> &'static str;

    /// Whether this error should be logged as an error or warning
    fn is_user_error(&self) -> bool {
        false
    }
}

/// Common result type for the application
pub type RefreshResult<T> = Result<T, Box<dyn RefreshError>>;

impl RefreshError for tabrefresh_config::ConfigError {
    fn error_code(&self) -> &'static str {
        tabrefresh_config::ConfigError::error_code(self)
    }

    fn is_user_error(&self) -> bool {
        matches!(
            self,
            tabrefresh_config::ConfigError::ConfigParseError { .. }
                | tabrefresh_config::ConfigError::InvalidConfiguration { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_code() {
        let err = tabrefresh_config::ConfigError::InvalidConfiguration {
            message: "bad".to_string(),
        };
        assert_eq!(RefreshError::error_code(&err), "config_invalid");
        assert!(err.is_user_error());
    }

    #[test]
    fn test_boxed_refresh_error() {
        let err: Box<dyn RefreshError> = Box::new(tabrefresh_config::ConfigError::IoError {
            source: std::io::Error::other("disk"),
        });
        assert_eq!(err.error_code(), "io_error");
        assert!(!err.is_user_error());
    }
}
