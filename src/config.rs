//! Configuration Module
//!
//! Handles loading and validating storage configuration from environment variables.

use std::env;
use std::time::Duration;

use crate::error::{Result, StorageError};

// == Limits ==
/// Upper bound for the max age, in seconds (60 years).
///
/// Keeps `now + max_age` far away from `i64` overflow.
pub const MAX_AGE_LIMIT: u64 = 86_400 * 3_652_425 * 60 / 10_000;

/// Smallest accepted reclaimer interval.
pub const MIN_GC_INTERVAL: Duration = Duration::from_secs(1);

/// Storage configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    /// Sliding TTL applied to every entry, in seconds
    pub max_age: u64,
    /// Target number of node slots (live + free)
    pub capacity: usize,
    /// Reclaimer interval in seconds
    pub gc_interval: u64,
}

impl StorageConfig {
    /// Creates a new StorageConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SESSION_MAX_AGE` - Sliding TTL in seconds (default: 1800)
    /// - `SESSION_CAPACITY` - Target slot count (default: 10000)
    /// - `SESSION_GC_INTERVAL` - Reclaimer interval in seconds (default: 60)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_age: env::var("SESSION_MAX_AGE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_age),
            capacity: env::var("SESSION_CAPACITY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.capacity),
            gc_interval: env::var("SESSION_GC_INTERVAL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.gc_interval),
        }
    }

    /// Reclaimer interval as a Duration.
    pub fn gc_interval_duration(&self) -> Duration {
        Duration::from_secs(self.gc_interval)
    }

    // == Validate ==
    /// Checks every parameter against its accepted range.
    pub fn validate(&self) -> Result<()> {
        validate_max_age(self.max_age)?;
        validate_capacity(self.capacity)?;
        validate_gc_interval(self.gc_interval_duration())
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            max_age: 1800,
            capacity: 10_000,
            gc_interval: 60,
        }
    }
}

pub(crate) fn validate_max_age(max_age: u64) -> Result<()> {
    if max_age == 0 {
        return Err(StorageError::InvalidConfiguration(
            "max_age must be > 0".to_string(),
        ));
    }
    if max_age > MAX_AGE_LIMIT {
        return Err(StorageError::InvalidConfiguration(format!(
            "max_age must be <= {} and is {}",
            MAX_AGE_LIMIT, max_age
        )));
    }
    Ok(())
}

pub(crate) fn validate_capacity(capacity: usize) -> Result<()> {
    if capacity == 0 {
        return Err(StorageError::InvalidConfiguration(
            "capacity must be > 0".to_string(),
        ));
    }
    Ok(())
}

pub(crate) fn validate_gc_interval(interval: Duration) -> Result<()> {
    if interval < MIN_GC_INTERVAL {
        return Err(StorageError::InvalidConfiguration(format!(
            "gc_interval must be >= {:?} and is {:?}",
            MIN_GC_INTERVAL, interval
        )));
    }
    Ok(())
}
