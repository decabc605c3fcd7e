//! Error types for sweep operations.
//!
//! Every fallible operation in the library returns [`SweepError`] through the
//! [`Result`] alias. Variants carry enough context (status codes, resource
//! names, source errors) for callers to decide whether a failure is fatal for
//! the run or only for the tag being processed.

use thiserror::Error;


/// Main error type for sweep operations
#[derive(Error, Debug)]
pub enum SweepError {
    /// Network-related errors (connection, timeout, DNS)
    #[error("Network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Authentication errors (401, 403)
    #[error("Authentication error (status: {status_code:?}): {message}")]
    Authentication {
        message: String,
        status_code: Option<u16>,
    },

    /// Resource not found errors (404)
    #[error("{resource_type} not found: {name}")]
    NotFound { resource_type: String, name: String },

    /// Rate limiting errors (429)
    #[error("Rate limit: {message}")]
    RateLimit {
        message: String,
        retry_after: Option<u64>,
    },

    /// Server errors (500, 502, 503, 504)
    #[error("Server error (status: {status_code}): {message}")]
    Server { message: String, status_code: u16 },

    /// Validation errors (undecodable manifest, digest mismatch, bad timestamp)
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration errors (unreadable config file, missing settings)
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        path: Option<String>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

/// Result type alias for sweep operations
pub type Result<T> = std::result::Result<T, SweepError>;

impl SweepError {
    /// Creates a new network error.
    ///
    /// # Examples
    ///
    /// ```
    /// use libsweep::error::SweepError;
    ///
    /// let err = SweepError::network("connection refused");
    /// assert!(matches!(err, SweepError::Network { .. }));
    /// ```
    pub fn network<S: Into<String>>(message: S) -> Self {
        Self::Network {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new network error with a source error.
    ///
    /// # Examples
    ///
    /// ```
    /// use libsweep::error::SweepError;
    /// use std::io;
    ///
    /// let io_err = io::Error::new(io::ErrorKind::ConnectionRefused, "connection refused");
    /// let err = SweepError::network_with_source("failed to connect", io_err);
    /// assert!(matches!(err, SweepError::Network { .. }));
    /// ```
    pub fn network_with_source<S, E>(message: S, source: E) -> Self
    where
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Network {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a new authentication error.
    ///
    /// # Examples
    ///
    /// ```
    /// use libsweep::error::SweepError;
    ///
    /// let err = SweepError::authentication("invalid credentials", Some(401));
    /// assert!(matches!(err, SweepError::Authentication { .. }));
    /// ```
    pub fn authentication<S: Into<String>>(message: S, status_code: Option<u16>) -> Self {
        Self::Authentication {
            message: message.into(),
            status_code,
        }
    }

    /// Creates a new not found error.
    ///
    /// # Examples
    ///
    /// ```
    /// use libsweep::error::SweepError;
    ///
    /// let err = SweepError::not_found("manifest", "myapp:v1.2.3");
    /// assert!(matches!(err, SweepError::NotFound { .. }));
    /// ```
    pub fn not_found<S: Into<String>>(resource_type: S, name: S) -> Self {
        Self::NotFound {
            resource_type: resource_type.into(),
            name: name.into(),
        }
    }

    /// Creates a new rate limit error.
    ///
    /// # Examples
    ///
    /// ```
    /// use libsweep::error::SweepError;
    ///
    /// let err = SweepError::rate_limit("too many requests", Some(60));
    /// assert!(matches!(err, SweepError::RateLimit { .. }));
    /// ```
    pub fn rate_limit<S: Into<String>>(message: S, retry_after: Option<u64>) -> Self {
        Self::RateLimit {
            message: message.into(),
            retry_after,
        }
    }

    /// Creates a new server error.
    ///
    /// # Examples
    ///
    /// ```
    /// use libsweep::error::SweepError;
    ///
    /// let err = SweepError::server("internal server error", 500);
    /// assert!(matches!(err, SweepError::Server { .. }));
    /// ```
    pub fn server<S: Into<String>>(message: S, status_code: u16) -> Self {
        Self::Server {
            message: message.into(),
            status_code,
        }
    }

    /// Creates a new validation error.
    ///
    /// # Examples
    ///
    /// ```
    /// use libsweep::error::SweepError;
    ///
    /// let err = SweepError::validation("manifest is not valid JSON");
    /// assert!(matches!(err, SweepError::Validation { .. }));
    /// ```
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new validation error with a source error.
    ///
    /// # Examples
    ///
    /// ```
    /// use libsweep::error::SweepError;
    /// use std::io;
    ///
    /// let io_err = io::Error::new(io::ErrorKind::InvalidData, "invalid data");
    /// let err = SweepError::validation_with_source("invalid format", io_err);
    /// assert!(matches!(err, SweepError::Validation { .. }));
    /// ```
    pub fn validation_with_source<S, E>(message: S, source: E) -> Self
    where
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Validation {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a new configuration error.
    ///
    /// # Examples
    ///
    /// ```
    /// use libsweep::error::SweepError;
    ///
    /// let err = SweepError::config("registry.url is required", Some("config.json"));
    /// assert!(matches!(err, SweepError::Config { .. }));
    /// ```
    pub fn config<S: Into<String>>(message: S, path: Option<S>) -> Self {
        Self::Config {
            message: message.into(),
            path: path.map(|p| p.into()),
            source: None,
        }
    }

    /// Creates a new configuration error with a source error.
    ///
    /// # Examples
    ///
    /// ```
    /// use libsweep::error::SweepError;
    /// use std::io;
    ///
    /// let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
    /// let err = SweepError::config_with_source("failed to read config", Some("config.json"), io_err);
    /// assert!(matches!(err, SweepError::Config { .. }));
    /// ```
    pub fn config_with_source<S, E>(message: S, path: Option<S>, source: E) -> Self
    where
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Config {
            message: message.into(),
            path: path.map(|p| p.into()),
            source: Some(Box::new(source)),
        }
    }
}
