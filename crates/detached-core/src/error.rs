//! Error types for detached aggregate operations.

use std::fmt;

/// The primary error type for all detached operations.
#[derive(Debug)]
pub enum Error {
    /// Configuration errors (unregistered types, bad schema wiring)
    Config(ConfigError),
    /// Storage backend errors, propagated unchanged
    Store(StoreError),
    /// Node decoding errors (graph value did not match the entity shape)
    Data(DataError),
    /// Custom error with message
    Custom(String),
}

/// A configuration problem detected before any storage round-trip.
///
/// These are invalid-argument class failures: the requested type is not a
/// registered entity, a navigation points at an unknown target, or a key
/// has the wrong arity. They are never retried.
#[derive(Debug)]
pub struct ConfigError {
    pub message: String,
}

/// A failure reported by the storage backend.
#[derive(Debug)]
pub struct StoreError {
    pub kind: StoreErrorKind,
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreErrorKind {
    /// Failed to reach the backend
    Connection,
    /// Constraint violation (unique, foreign key, etc.)
    Constraint,
    /// Transaction could not be committed or rolled back
    Transaction,
    /// Other backend error
    Backend,
}

/// A mismatch between an entity node and the shape an entity expects.
#[derive(Debug)]
pub struct DataError {
    pub expected: &'static str,
    pub actual: String,
    pub field: Option<String>,
}

impl Error {
    /// Shorthand for a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Error::Config(ConfigError {
            message: message.into(),
        })
    }

    /// Is this a configuration (invalid-argument) error?
    pub fn is_config(&self) -> bool {
        matches!(self, Error::Config(_))
    }

    /// Is this a constraint violation from the backend?
    pub fn is_constraint_violation(&self) -> bool {
        matches!(
            self,
            Error::Store(StoreError {
                kind: StoreErrorKind::Constraint,
                ..
            })
        )
    }
}

impl StoreError {
    /// Create a store error without an underlying source.
    pub fn new(kind: StoreErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }
}

impl DataError {
    /// Create a data error for a named field.
    pub fn field(expected: &'static str, actual: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            expected,
            actual: actual.into(),
            field: Some(field.into()),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Config(e) => write!(f, "Configuration error: {}", e.message),
            Error::Store(e) => write!(f, "Store error: {}", e.message),
            Error::Data(e) => {
                if let Some(field) = &e.field {
                    write!(
                        f,
                        "Data error in field '{}': expected {}, found {}",
                        field, e.expected, e.actual
                    )
                } else {
                    write!(f, "Data error: expected {}, found {}", e.expected, e.actual)
                }
            }
            Error::Custom(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Store(e) => e
                .source
                .as_deref()
                .map(|err| err as &(dyn std::error::Error + 'static)),
            _ => None,
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Display for DataError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(field) = &self.field {
            write!(
                f,
                "expected {} for field '{}', found {}",
                self.expected, field, self.actual
            )
        } else {
            write!(f, "expected {}, found {}", self.expected, self.actual)
        }
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Error::Config(err)
    }
}

impl From<StoreError> for Error {
    fn from(err: StoreError) -> Self {
        Error::Store(err)
    }
}

impl From<DataError> for Error {
    fn from(err: DataError) -> Self {
        Error::Data(err)
    }
}

/// Result type alias for detached operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_shorthand_and_flag() {
        let err = Error::config("User is not a registered entity");
        assert!(err.is_config());
        assert!(!err.is_constraint_violation());
        assert_eq!(
            err.to_string(),
            "Configuration error: User is not a registered entity"
        );
    }

    #[test]
    fn constraint_violation_flag() {
        let err = Error::Store(StoreError::new(
            StoreErrorKind::Constraint,
            "unique violation on users.email",
        ));
        assert!(err.is_constraint_violation());
        assert!(!err.is_config());
    }

    #[test]
    fn data_error_display_includes_field() {
        let err = Error::Data(DataError::field("BIGINT", "TEXT", "id"));
        assert_eq!(
            err.to_string(),
            "Data error in field 'id': expected BIGINT, found TEXT"
        );
    }
}
