//! Centralized error handling for vod-resolve
//!
//! Errors are split by the layer that produces them and funnel into
//! [`AppError`], whose top-level variants are what callers branch on.
//!
//! # Error Categories
//!
//! - **NotFound**: nothing to show or play; always recoverable
//! - **UpstreamUnavailable**: the metadata or stream source could not be reached
//! - **InvariantViolation**: configuration or input that would produce an inconsistent plan
//! - **Store**: the host library store rejected or failed an operation
//!
//! # Usage
//!
//! ```rust
//! use vod_resolve::errors::{AppError, AppResult};
//!
//! fn pick(urls: &[String]) -> AppResult<&String> {
//!     urls.first().ok_or_else(|| AppError::not_found("stream", "tt0133093"))
//! }
//! ```

pub mod types;

pub use types::*;

/// Convenience type alias for Results using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Convenience type alias for host store Results
pub type StoreResult<T> = Result<T, StoreError>;

/// Convenience type alias for upstream source Results
pub type SourceResult<T> = Result<T, SourceError>;
