//! Custom error types for translation dispatch

use thiserror::Error;

/// Translation-related errors
#[derive(Error, Debug)]
pub enum TranslationError {
    /// Token refresh call failed before a usable credential arrived
    #[error("Token refresh failed: {message}")]
    RefreshTransportError {
        message: String,
    },

    /// Translate call failed before any response was received
    #[error("Dispatch failed: {message}")]
    DispatchTransportError {
        message: String,
    },

    /// Response received but unusable
    #[error("Provider response error: {status} - {message}")]
    ProviderResponseError {
        status: u16,
        message: String,
    },

    /// Network error
    #[error("Network error: {message}")]
    NetworkError {
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    ConfigError {
        message: String,
    },

    /// Wrapper for anyhow errors
    #[error("Internal error: {0}")]
    InternalError(String),

    /// Reqwest error
    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),
}

impl TranslationError {
    /// Re-tag a transport failure as having happened on the refresh call.
    pub fn into_refresh(self) -> Self {
        match self {
            Self::RefreshTransportError { .. } => self,
            other => Self::RefreshTransportError {
                message: other.to_string(),
            },
        }
    }

    /// Re-tag a transport failure as having happened on the translate call.
    pub fn into_dispatch(self) -> Self {
        match self {
            Self::DispatchTransportError { .. } => self,
            other => Self::DispatchTransportError {
                message: other.to_string(),
            },
        }
    }
}

impl From<anyhow::Error> for TranslationError {
    fn from(err: anyhow::Error) -> Self {
        TranslationError::InternalError(err.to_string())
    }
}

/// Result type for translation operations
pub type Result<T> = std::result::Result<T, TranslationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TranslationError::RefreshTransportError {
            message: "dns failure".to_string(),
        };
        assert!(err.to_string().contains("dns failure"));

        let err = TranslationError::ProviderResponseError {
            status: 401,
            message: "Unauthorized".to_string(),
        };
        assert!(err.to_string().contains("401"));
        assert!(err.to_string().contains("Unauthorized"));
    }

    #[test]
    fn test_retag_transport_errors() {
        let err = TranslationError::NetworkError {
            message: "connection refused".to_string(),
        };
        let err = err.into_refresh();
        assert!(matches!(err, TranslationError::RefreshTransportError { .. }));
        assert!(err.to_string().contains("connection refused"));

        let err = TranslationError::NetworkError {
            message: "reset".to_string(),
        }
        .into_dispatch();
        assert!(matches!(err, TranslationError::DispatchTransportError { .. }));

        // already tagged errors keep their message untouched
        let err = TranslationError::DispatchTransportError {
            message: "boom".to_string(),
        }
        .into_dispatch();
        assert_eq!(err.to_string(), "Dispatch failed: boom");
    }
}
