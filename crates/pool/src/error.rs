//! Error types for the resource pool
use thiserror::Error;

use crate::lease::LeaseId;

/// Result type for pool operations
pub type Result<T> = std::result::Result<T, PoolError>;

/// Boxed error cause carried by [`FactoryError`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Error reported by a [`Factory`](crate::Factory) when it cannot create or
/// destroy a resource.
#[derive(Error, Debug)]
#[error("{message}")]
pub struct FactoryError {
    message: String,
    #[source]
    source: Option<BoxError>,
}

impl FactoryError {
    /// Create a factory error with a message only.
    pub fn new<S: Into<String>>(message: S) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Create a factory error wrapping an underlying cause.
    pub fn with_source<S, E>(message: S, source: E) -> Self
    where
        S: Into<String>,
        E: Into<BoxError>,
    {
        Self {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// The human readable failure message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Errors returned by [`Pool`](crate::Pool) operations.
///
/// Only construction surfaces factory failures. Failed background growth,
/// dead resources found on checkout and failed destroys are absorbed by the
/// pool and show up as slower or blocked acquisition instead.
#[derive(Error, Debug)]
pub enum PoolError {
    /// The pool configuration is invalid
    #[error("Invalid pool configuration: {message}")]
    InvalidConfiguration {
        /// What was wrong with the configuration
        message: String,
    },

    /// The factory failed while populating the pool
    #[error("Resource factory failed: {0}")]
    Factory(#[from] FactoryError),

    /// The pool has been shut down
    #[error("Pool is closed")]
    Closed,

    /// A lease was released to a pool that does not have it checked out
    #[error("Lease {lease_id} is not checked out from this pool")]
    NotOwned {
        /// The offending lease
        lease_id: LeaseId,
    },

    /// A bounded acquire ran out of time
    #[error("Timed out after {timeout_ms}ms waiting for a pooled resource")]
    Timeout {
        /// The configured acquire timeout in milliseconds
        timeout_ms: u64,
    },
}

impl PoolError {
    /// Create an invalid configuration error
    pub fn invalid_configuration<S: Into<String>>(message: S) -> Self {
        Self::InvalidConfiguration {
            message: message.into(),
        }
    }

    /// Check if retrying the same operation later may succeed
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn factory_error_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err = FactoryError::with_source("connect failed", io);
        assert_eq!(err.to_string(), "connect failed");
        assert_eq!(err.source().map(ToString::to_string).as_deref(), Some("refused"));
    }

    #[test]
    fn factory_error_converts_into_pool_error() {
        let err: PoolError = FactoryError::new("boom").into();
        assert!(matches!(err, PoolError::Factory(_)));
        assert_eq!(err.to_string(), "Resource factory failed: boom");
    }

    #[test]
    fn only_timeout_is_retryable() {
        assert!(PoolError::Timeout { timeout_ms: 5 }.is_retryable());
        assert!(!PoolError::Closed.is_retryable());
        assert!(!PoolError::invalid_configuration("bad").is_retryable());
        assert!(
            !PoolError::NotOwned {
                lease_id: LeaseId::new(3)
            }
            .is_retryable()
        );
    }

    #[test]
    fn not_owned_names_the_lease() {
        let err = PoolError::NotOwned {
            lease_id: LeaseId::new(42),
        };
        assert_eq!(err.to_string(), "Lease #42 is not checked out from this pool");
    }
}
