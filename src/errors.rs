//! Error types and boundary validation for pattern analysis.
//!
//! Fatal problems (malformed input, invalid configuration, I/O) surface as
//! [`PatternAnalysisError`]. Statistics that simply cannot be computed from the
//! data at hand are not errors: detectors return a [`DegradedStatistic`] and the
//! report carries the documented neutral value instead.

use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Error types for pattern analysis operations.
#[derive(Error, Debug, Clone)]
#[non_exhaustive]
pub enum PatternAnalysisError {
    /// Malformed or missing input. Fatal to a single analysis call.
    #[error("Validation failed for `{field}`: {reason}")]
    ValidationError {
        /// Offending field, e.g. `trades[3].pnl`
        field: String,
        /// What was wrong with it
        reason: String,
    },

    /// Invalid configuration parameter.
    #[error("Invalid parameter: {parameter} = {value}, expected {constraint}")]
    InvalidParameter {
        /// Parameter name
        parameter: String,
        /// Invalid value provided
        value: f64,
        /// Valid range or constraint description
        constraint: String,
    },

    /// Input whose derived returns or equity leave the representable range.
    #[error("Numerical computation failed: {reason}")]
    NumericalError {
        /// Detailed reason for numerical failure
        reason: String,
    },

    /// I/O operation error.
    #[error("I/O operation failed: {operation}")]
    IoError {
        /// I/O operation that failed
        operation: String,
        /// Underlying error if available
        #[source]
        source: Option<Arc<std::io::Error>>,
    },

    /// Serialization/deserialization error.
    #[error("Serialization failed ({format}): {reason}")]
    SerializationError {
        /// Format that failed
        format: String,
        /// Underlying message
        reason: String,
    },
}

/// Result type for pattern analysis operations.
pub type PatternResult<T> = Result<T, PatternAnalysisError>;

impl PatternAnalysisError {
    /// Shorthand for a field-level validation failure.
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        PatternAnalysisError::ValidationError {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Wrap an I/O error with the operation that produced it.
    pub fn io(operation: impl Into<String>, source: std::io::Error) -> Self {
        PatternAnalysisError::IoError {
            operation: operation.into(),
            source: Some(Arc::new(source)),
        }
    }
}

/// A statistic that could not be computed from the given data.
///
/// This is a value-level outcome, not an error: the caller substitutes the
/// detector's neutral record and keeps going.
#[derive(Debug, Clone, PartialEq)]
pub struct DegradedStatistic {
    /// Which statistic degraded
    pub test_name: &'static str,
    /// Why it could not be computed
    pub reason: String,
}

impl DegradedStatistic {
    /// Create a new degraded outcome.
    pub fn new(test_name: &'static str, reason: impl Into<String>) -> Self {
        Self {
            test_name,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for DegradedStatistic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} degraded: {}", self.test_name, self.reason)
    }
}

/// Validates that a parameter is within inclusive bounds.
///
/// # Example
/// ```rust
/// use mc_pattern_analysis::errors::validate_parameter;
///
/// assert!(validate_parameter(1.25, 0.0, 10.0, "leverage").is_ok());
/// assert!(validate_parameter(-1.0, 0.0, 10.0, "leverage").is_err());
/// ```
pub fn validate_parameter(value: f64, min: f64, max: f64, name: &str) -> PatternResult<()> {
    if value.is_nan() {
        return Err(PatternAnalysisError::InvalidParameter {
            parameter: name.to_string(),
            value,
            constraint: "must not be NaN".to_string(),
        });
    }

    if min.is_nan() || max.is_nan() || min > max {
        return Err(PatternAnalysisError::NumericalError {
            reason: format!(
                "Invalid bounds for parameter {}: min={}, max={}",
                name, min, max
            ),
        });
    }

    if value < min || value > max {
        Err(PatternAnalysisError::InvalidParameter {
            parameter: name.to_string(),
            value,
            constraint: format!("[{}, {}]", min, max),
        })
    } else {
        Ok(())
    }
}

/// Validates that a parameter is finite and strictly positive.
pub fn validate_positive(value: f64, name: &str) -> PatternResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(PatternAnalysisError::InvalidParameter {
            parameter: name.to_string(),
            value,
            constraint: "finite and > 0".to_string(),
        })
    }
}

/// Validates that a single value is finite.
pub fn validate_finite(value: f64, name: &str) -> PatternResult<()> {
    if !value.is_finite() {
        Err(PatternAnalysisError::validation(
            name,
            format!("must be a finite number, got {}", value),
        ))
    } else {
        Ok(())
    }
}

/// Validates that all values in a slice are finite, reporting the first bad index.
pub fn validate_all_finite(data: &[f64], name: &str) -> PatternResult<()> {
    if let Some((i, value)) = data.iter().enumerate().find(|(_, v)| !v.is_finite()) {
        return Err(PatternAnalysisError::validation(
            format!("{}[{}]", name, i),
            format!("must be a finite number, got {}", value),
        ));
    }
    Ok(())
}
