//! Error handling types

use thiserror::Error;

/// Result type alias for operations that can fail
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for Waypoint
#[derive(Error, Debug)]
pub enum Error {
    /// A service name was resolved that was never registered
    #[error("Service not registered: {name}")]
    NotRegistered {
        /// The unknown service name
        name: String,
    },

    /// Establishing a service (connect, handshake, auth) failed
    #[error("Failed to connect service '{service}': {message}")]
    Connect {
        /// Service or backend being established
        service: String,
        /// Description of the failure
        message: String,
        /// Optional source error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A round trip to an established backend failed or timed out
    #[error("Connection error: {message}")]
    Connection {
        /// Description of the network failure
        message: String,
        /// Optional source error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The backend rejected or could not complete a cache command
    #[error("Cache operation error: {message}")]
    CacheOperation {
        /// Description of the cache error
        message: String,
        /// Optional source error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// JSON parsing or serialization error
    #[error("Serialization error: {source}")]
    Serialization {
        /// The underlying JSON error
        #[from]
        source: serde_json::Error,
    },

    /// Configuration-related error
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the configuration error
        message: String,
        /// Optional source error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Invalid argument provided to a function
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Description of the invalid argument
        message: String,
    },

    /// Internal system error
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the internal error
        message: String,
    },
}

// Registry and lifecycle error creation methods
impl Error {
    /// Create a not-registered error
    pub fn not_registered<S: Into<String>>(name: S) -> Self {
        Self::NotRegistered { name: name.into() }
    }

    /// Create a connect error
    pub fn connect<S: Into<String>, M: Into<String>>(service: S, message: M) -> Self {
        Self::Connect {
            service: service.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Create a connect error with source
    pub fn connect_with_source<
        S: Into<String>,
        M: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    >(
        service: S,
        message: M,
        source: E,
    ) -> Self {
        Self::Connect {
            service: service.into(),
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

// Runtime cache error creation methods
impl Error {
    /// Create a connection error
    pub fn connection<S: Into<String>>(message: S) -> Self {
        Self::Connection {
            message: message.into(),
            source: None,
        }
    }

    /// Create a connection error with source
    pub fn connection_with_source<S: Into<String>, E: std::error::Error + Send + Sync + 'static>(
        message: S,
        source: E,
    ) -> Self {
        Self::Connection {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a cache operation error
    pub fn cache_operation<S: Into<String>>(message: S) -> Self {
        Self::CacheOperation {
            message: message.into(),
            source: None,
        }
    }

    /// Create a cache operation error with source
    pub fn cache_operation_with_source<
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    >(
        message: S,
        source: E,
    ) -> Self {
        Self::CacheOperation {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Whether this error came from the network rather than the command
    pub fn is_connection(&self) -> bool {
        matches!(self, Self::Connection { .. } | Self::Connect { .. })
    }
}

// Configuration and argument error creation methods
impl Error {
    /// Create a configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
            source: None,
        }
    }

    /// Create a configuration error with source
    pub fn configuration_with_source<
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    >(
        message: S,
        source: E,
    ) -> Self {
        Self::Configuration {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an invalid argument error
    pub fn invalid_argument<S: Into<String>>(message: S) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}
