//! Error types and handling for the travel optimizer

use thiserror::Error;

/// Main error type for the travel optimizer
///
/// Provider failures are deliberately absent: they are captured by the
/// aggregator as [`crate::providers::ProviderError`] and reported as plan
/// metadata instead of failing a request.
#[derive(Error, Debug)]
pub enum TravelOptimizerError {
    /// Invalid query or configuration, raised before any provider is called
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// I/O operation errors
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// General application errors
    #[error("Application error: {message}")]
    General { message: String },
}

impl TravelOptimizerError {
    /// Create a new configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a new general error
    pub fn general<S: Into<String>>(message: S) -> Self {
        Self::General {
            message: message.into(),
        }
    }

    /// True for errors caused by the caller's request rather than the system
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration { .. })
    }

    /// Get a user-friendly error message
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            TravelOptimizerError::Configuration { message } => {
                format!("Request rejected: {message}")
            }
            TravelOptimizerError::Io { .. } => {
                "File operation failed. Please check file permissions.".to_string()
            }
            TravelOptimizerError::General { message } => message.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let config_err = TravelOptimizerError::configuration("all weights are zero");
        assert!(matches!(config_err, TravelOptimizerError::Configuration { .. }));
        assert!(config_err.is_configuration());

        let general_err = TravelOptimizerError::general("something broke");
        assert!(matches!(general_err, TravelOptimizerError::General { .. }));
        assert!(!general_err.is_configuration());
    }

    #[test]
    fn test_user_messages() {
        let config_err = TravelOptimizerError::configuration("invalid date 'tomorrow'");
        assert!(config_err.user_message().contains("Request rejected"));
        assert!(config_err.user_message().contains("tomorrow"));

        let general_err = TravelOptimizerError::general("plain message");
        assert_eq!(general_err.user_message(), "plain message");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: TravelOptimizerError = io_err.into();
        assert!(matches!(err, TravelOptimizerError::Io { .. }));
        assert!(err.user_message().contains("File operation failed"));
    }
}
