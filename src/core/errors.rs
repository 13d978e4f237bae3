use thiserror::Error;

/// Unified error type for the converge library
#[derive(Debug, Error)]
pub enum ConvergeError {
    /// Configuration errors
    #[error("Configuration error: {message}")]
    Configuration {
        message: String,
        field: Option<String>,
    },

    /// Serialization errors
    #[error("Serialization failed: {format}")]
    Serialization {
        format: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A callback was requested after the aggregate outcome was decided
    #[error("Coordinator {coordinator} already resolved; no further callbacks may be minted")]
    AlreadyResolved { coordinator: String },

    /// A second completion closure was registered
    #[error("Coordinator {coordinator} already has a completion registered")]
    AlreadyFinalized { coordinator: String },

    /// The coordinator was cancelled before it could complete
    #[error("Coordinator {coordinator} was cancelled")]
    Cancelled { coordinator: String },

    /// Generic internal errors
    #[error("Internal error: {message}")]
    Internal {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl ConvergeError {
    /// Create a configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
            field: None,
        }
    }

    /// Create a configuration error naming the offending field
    pub fn configuration_field<S: Into<String>, F: Into<String>>(message: S, field: F) -> Self {
        Self::Configuration {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Create a serialization error
    pub fn serialization<S: Into<String>, E: std::error::Error + Send + Sync + 'static>(
        format: S,
        source: E,
    ) -> Self {
        Self::Serialization {
            format: format.into(),
            source: Box::new(source),
        }
    }

    pub fn already_resolved<S: Into<String>>(coordinator: S) -> Self {
        Self::AlreadyResolved {
            coordinator: coordinator.into(),
        }
    }

    pub fn already_finalized<S: Into<String>>(coordinator: S) -> Self {
        Self::AlreadyFinalized {
            coordinator: coordinator.into(),
        }
    }

    pub fn cancelled<S: Into<String>>(coordinator: S) -> Self {
        Self::Cancelled {
            coordinator: coordinator.into(),
        }
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
            source: None,
        }
    }

    /// Check if the caller can reasonably retry with a fresh coordinator
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Cancelled { .. } => true,
            Self::AlreadyResolved { .. } | Self::AlreadyFinalized { .. } => false,
            Self::Configuration { .. } | Self::Serialization { .. } => false,
            Self::Internal { .. } => false,
        }
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            Self::Configuration { .. } => "configuration",
            Self::Serialization { .. } => "serialization",
            Self::AlreadyResolved { .. } | Self::AlreadyFinalized { .. } => "precondition",
            Self::Cancelled { .. } => "cancelled",
            Self::Internal { .. } => "internal",
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, ConvergeError>;

impl From<serde_json::Error> for ConvergeError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization("json", err)
    }
}

impl From<serde_yaml::Error> for ConvergeError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::serialization("yaml", err)
    }
}

impl From<anyhow::Error> for ConvergeError {
    fn from(err: anyhow::Error) -> Self {
        Self::internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precondition_errors() {
        let err = ConvergeError::already_resolved("fetch");
        assert_eq!(err.category(), "precondition");
        assert!(!err.is_recoverable());
        assert_eq!(
            err.to_string(),
            "Coordinator fetch already resolved; no further callbacks may be minted"
        );

        let err = ConvergeError::already_finalized("fetch");
        assert_eq!(err.category(), "precondition");
    }

    #[test]
    fn test_cancelled_is_recoverable() {
        let err = ConvergeError::cancelled("lookup");
        assert!(err.is_recoverable());
        assert_eq!(err.category(), "cancelled");
        assert_eq!(err.to_string(), "Coordinator lookup was cancelled");
    }

    #[test]
    fn test_configuration_field() {
        let err = ConvergeError::configuration_field("must not be empty", "name");
        match err {
            ConvergeError::Configuration { message, field } => {
                assert_eq!(message, "must not be empty");
                assert_eq!(field.as_deref(), Some("name"));
            }
            other => panic!("Expected configuration error, got {:?}", other),
        }
    }

    #[test]
    fn test_json_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: ConvergeError = json_err.into();
        assert!(matches!(err, ConvergeError::Serialization { ref format, .. } if format == "json"));
        assert_eq!(err.category(), "serialization");
    }

    #[test]
    fn test_anyhow_conversion() {
        let err: ConvergeError = anyhow::anyhow!("dispatcher went away").into();
        assert!(matches!(err, ConvergeError::Internal { .. }));
        assert!(err.to_string().contains("dispatcher went away"));
    }
}
