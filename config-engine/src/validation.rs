// Post-load sanity checks
use crate::error::{ConfigError, Result};

/// Semantic checks run after a configuration has been deserialized
pub trait ConfigValidation {
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] describing the first bad value.
    fn validate(&self) -> Result<()>;
}

/// Helper for the common "must be positive" check.
///
/// # Errors
///
/// Fails when `value` is zero.
pub fn require_positive(field: &str, value: u64) -> Result<()> {
    if value == 0 {
        return Err(ConfigError::ValidationError(format!("{field} must be greater than zero")));
    }
    Ok(())
}

/// # Errors
///
/// Fails when `value` is empty or only whitespace.
pub fn require_non_empty(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ConfigError::ValidationError(format!("{field} must not be empty")));
    }
    Ok(())
}
