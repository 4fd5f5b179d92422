//! Error types for the session cache
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Storage Error Enum ==
/// Unified error type for storage operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// Key is absent or its entry has expired
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Insert-only add collided with a live entry
    #[error("Key already exists: {0}")]
    AlreadyExists(String),

    /// The live list reached the platform counter bound
    #[error("Capacity exhausted: live entry counter reached its limit")]
    CapacityExhausted,

    /// Construction or reconfiguration parameters were rejected
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The background reclaimer has been shut down
    #[error("Reclaimer stopped")]
    ReclaimerStopped,
}

// == Result Type Alias ==
/// Convenience Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            StorageError::NotFound("sid".to_string()).to_string(),
            "Key not found: sid"
        );
        assert_eq!(
            StorageError::AlreadyExists("sid".to_string()).to_string(),
            "Key already exists: sid"
        );
        assert_eq!(StorageError::ReclaimerStopped.to_string(), "Reclaimer stopped");
    }
}
