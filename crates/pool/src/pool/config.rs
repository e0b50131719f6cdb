//! Pool configuration types

use std::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{PoolError, Result};

/// Configuration for a resource pool
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PoolConfig {
    /// Number of resources created eagerly during construction
    pub initial_size: usize,
    /// Maximum number of resources in existence at once (idle + busy)
    pub max_size: usize,
    /// Upper bound on how long `acquire` waits; `None` waits indefinitely
    pub acquire_timeout: Option<Duration>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            initial_size: 1,
            max_size: 10,
            acquire_timeout: None,
        }
    }
}

impl PoolConfig {
    /// Configuration with `initial_size` eager resources and a hard ceiling
    /// of `max_size`.
    #[must_use]
    pub fn new(initial_size: usize, max_size: usize) -> Self {
        Self {
            initial_size,
            max_size,
            ..Self::default()
        }
    }

    /// Bound every `acquire` by `timeout`.
    #[must_use]
    pub fn with_acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = Some(timeout);
        self
    }

    /// Validate pool configuration, returning an error if invalid.
    pub fn validate(&self) -> Result<()> {
        if self.initial_size == 0 {
            return Err(PoolError::invalid_configuration(
                "initial_size must be greater than 0",
            ));
        }
        if self.max_size == 0 {
            return Err(PoolError::invalid_configuration(
                "max_size must be at least 1",
            ));
        }
        if self.initial_size > self.max_size {
            return Err(PoolError::invalid_configuration(format!(
                "initial_size ({}) must not exceed max_size ({})",
                self.initial_size, self.max_size
            )));
        }
        if self.acquire_timeout.is_some_and(|t| t.is_zero()) {
            return Err(PoolError::invalid_configuration(
                "acquire_timeout must be greater than zero",
            ));
        }
        Ok(())
    }
}
