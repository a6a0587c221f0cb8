//! Error type definitions for vod-resolve

use std::time::Duration;

use thiserror::Error;

/// Top-level error type
///
/// `NotFound` and `UpstreamUnavailable` are deliberately distinct so the
/// host integration can show "no stream available" and "source temporarily
/// unreachable" differently.
#[derive(Error, Debug)]
pub enum AppError {
    /// Nothing matched: no candidates, no existing item, no cached metadata
    #[error("Not found: {resource} with id {id}")]
    NotFound { resource: String, id: String },

    /// Metadata or stream source call failed
    #[error("Upstream unavailable: {service} - {message}")]
    UpstreamUnavailable { service: String, message: String },

    /// Input or configuration that would break an internal invariant
    #[error("Invariant violation: {message}")]
    InvariantViolation { message: String },

    /// Host store errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Configuration file could not be read or parsed
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Operation exceeded its deadline
    #[error("Timed out after {elapsed:?}: {operation}")]
    Timeout { operation: String, elapsed: Duration },
}

/// Host library store errors
#[derive(Error, Debug, Clone)]
pub enum StoreError {
    /// Store could not be reached or is temporarily busy
    #[error("Store unavailable: {message}")]
    Unavailable { message: String },

    /// Store refused the operation (bad parent, invalid item)
    #[error("Store rejected {operation}: {message}")]
    Rejected { operation: String, message: String },

    /// Parent container does not exist
    #[error("Container not found: {container}")]
    ContainerNotFound { container: String },

    /// Store call exceeded the configured timeout
    #[error("Store operation timed out: {operation}")]
    Timeout { operation: String },
}

/// Upstream metadata/stream source errors
#[derive(Error, Debug)]
pub enum SourceError {
    /// Network timeout
    #[error("Connection timeout: {url}")]
    Timeout { url: String },

    /// Non-success HTTP status from the upstream
    #[error("HTTP error: {status} - {message}")]
    Http { status: u16, message: String },

    /// Response body did not have the expected shape
    #[error("Parse error: {source_type} - {message}")]
    ParseError { source_type: String, message: String },

    /// Invalid source configuration (bad base URL)
    #[error("Invalid configuration: {field} - {message}")]
    InvalidConfig { field: String, message: String },

    /// Transport-level failure
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),
}

impl AppError {
    /// Create a not-found error
    pub fn not_found<R: Into<String>, I: Into<String>>(resource: R, id: I) -> Self {
        Self::NotFound {
            resource: resource.into(),
            id: id.into(),
        }
    }

    /// Create an upstream-unavailable error
    pub fn upstream<S: Into<String>, M: Into<String>>(service: S, message: M) -> Self {
        Self::UpstreamUnavailable {
            service: service.into(),
            message: message.into(),
        }
    }

    /// Create an invariant violation
    pub fn invariant<S: Into<String>>(message: S) -> Self {
        Self::InvariantViolation {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_upstream_unavailable(&self) -> bool {
        matches!(self, Self::UpstreamUnavailable { .. } | Self::Timeout { .. })
    }
}

impl From<SourceError> for AppError {
    fn from(err: SourceError) -> Self {
        let service = match &err {
            SourceError::Timeout { url } => url.clone(),
            _ => "stream source".to_string(),
        };
        Self::UpstreamUnavailable {
            service,
            message: err.to_string(),
        }
    }
}

impl StoreError {
    pub fn unavailable<S: Into<String>>(message: S) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    pub fn rejected<O: Into<String>, M: Into<String>>(operation: O, message: M) -> Self {
        Self::Rejected {
            operation: operation.into(),
            message: message.into(),
        }
    }
}

impl SourceError {
    pub fn parse<S: Into<String>, M: Into<String>>(source_type: S, message: M) -> Self {
        Self::ParseError {
            source_type: source_type.into(),
            message: message.into(),
        }
    }
}

/// Errors that a retry policy may safely try again
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

impl Retryable for StoreError {
    fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable { .. } | Self::Timeout { .. })
    }
}

impl Retryable for SourceError {
    fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout { .. } => true,
            Self::Http { status, .. } => *status == 429 || *status >= 500,
            Self::Request(err) => err.is_timeout() || err.is_connect(),
            Self::ParseError { .. } | Self::InvalidConfig { .. } => false,
        }
    }
}

impl Retryable for AppError {
    fn is_retryable(&self) -> bool {
        match self {
            Self::Store(err) => err.is_retryable(),
            Self::UpstreamUnavailable { .. } | Self::Timeout { .. } => true,
            _ => false,
        }
    }
}
