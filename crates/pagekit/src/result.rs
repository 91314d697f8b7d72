//! Result and error types for pagekit.
//!
//! Resolution and transition failures are never swallowed: every variant
//! here reaches the calling test unchanged. The only internal retry is the
//! bounded poll behind element lookup and waits.

use thiserror::Error;

/// Result type for pagekit operations
pub type PageResult<T> = Result<T, PageError>;

/// Result type for raw driver calls
pub type DriverResult<T> = Result<T, DriverError>;

/// Errors that can occur while resolving page objects
#[derive(Debug, Error)]
pub enum PageError {
    /// Zero matches after the scope's timeout elapsed
    #[error("Element not found: {locator} (waited {timeout_ms}ms)")]
    ElementNotFound {
        /// Locator that was searched for
        locator: String,
        /// Timeout in milliseconds
        timeout_ms: u64,
    },

    /// The element exists but never became visible
    #[error("Element not visible: {locator} (waited {timeout_ms}ms)")]
    ElementNotVisible {
        /// Locator that was searched for
        locator: String,
        /// Timeout in milliseconds
        timeout_ms: u64,
    },

    /// Multiple matches where exactly one was expected
    #[error("Ambiguous element: {locator} matched {count} elements")]
    AmbiguousElement {
        /// Locator that was searched for
        locator: String,
        /// Number of matches found
        count: usize,
    },

    /// Table index outside the live row count
    #[error("Row index {index} out of range (table has {count} rows)")]
    IndexOutOfRange {
        /// Requested index
        index: usize,
        /// Live row count at query time
        count: usize,
    },

    /// An action returned a discriminant with no registered page
    #[error("Unknown transition target for action '{action}': {token}")]
    UnknownTransitionTarget {
        /// Action name
        action: String,
        /// Discriminant the action produced
        token: String,
    },

    /// A logical page name could not be resolved to a page type
    #[error("Cannot resolve page '{name}': {message}")]
    TransitionResolutionError {
        /// Logical page name
        name: String,
        /// Error message
        message: String,
    },

    /// A transition produced a different page type than the caller asked for
    #[error("Expected page {expected}, got {actual}")]
    UnexpectedPage {
        /// Requested type
        expected: &'static str,
        /// Type actually constructed
        actual: &'static str,
    },

    /// A wait condition was never satisfied
    #[error("Timed out after {timeout_ms}ms waiting for {waited_for}")]
    WaitTimeout {
        /// Description of the condition
        waited_for: String,
        /// Timeout in milliseconds
        timeout_ms: u64,
    },

    /// Invalid component declaration or query against undeclared fields
    #[error("Declaration error in {type_name}: {message}")]
    DeclarationError {
        /// Component type being declared or queried
        type_name: String,
        /// Error message
        message: String,
    },

    /// Element content could not be coerced into the requested kind
    #[error("Cannot coerce '{value}' to {expected}")]
    ValueCoercion {
        /// Raw value read from the element
        value: String,
        /// Target kind
        expected: &'static str,
    },

    /// Invalid configuration
    #[error("Configuration error: {message}")]
    ConfigError {
        /// Error message
        message: String,
    },

    /// Error reported by the browser driver
    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PageError {
    /// Build a declaration error for a type
    pub fn declaration(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::DeclarationError {
            type_name: type_name.into(),
            message: message.into(),
        }
    }

    /// Whether this is a timeout of some kind
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::WaitTimeout { .. } | Self::ElementNotFound { .. } | Self::ElementNotVisible { .. }
        )
    }
}

/// Errors reported by a [`Driver`](crate::Driver) implementation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DriverError {
    /// The handle no longer refers to an element in the document
    #[error("Stale element reference: {id}")]
    StaleElement {
        /// Handle id
        id: String,
    },

    /// No window at the requested position
    #[error("No such window: {handle}")]
    NoSuchWindow {
        /// Window handle or index
        handle: String,
    },

    /// No alert is open
    #[error("No alert present")]
    NoAlertPresent,

    /// Script evaluation failed
    #[error("Script failed: {message}")]
    Script {
        /// Error message
        message: String,
    },

    /// Anything else the driver reports
    #[error("{message}")]
    Other {
        /// Error message
        message: String,
    },
}

impl DriverError {
    /// Errors that a poll loop treats as "not yet" rather than failure
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::StaleElement { .. } | Self::NoAlertPresent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = PageError::IndexOutOfRange { index: 3, count: 2 };
        assert_eq!(err.to_string(), "Row index 3 out of range (table has 2 rows)");

        let err = PageError::declaration("LoginPage", "duplicate field 'user'");
        assert!(err.to_string().contains("LoginPage"));
    }

    #[test]
    fn test_driver_error_converts() {
        let err: PageError = DriverError::NoAlertPresent.into();
        assert!(matches!(err, PageError::Driver(DriverError::NoAlertPresent)));
    }

    #[test]
    fn test_timeout_classification() {
        assert!(PageError::WaitTimeout {
            waited_for: "url change".into(),
            timeout_ms: 10
        }
        .is_timeout());
        assert!(!PageError::IndexOutOfRange { index: 0, count: 0 }.is_timeout());
    }

    #[test]
    fn test_transient_driver_errors() {
        assert!(DriverError::StaleElement { id: "e1".into() }.is_transient());
        assert!(!DriverError::Script {
            message: "boom".into()
        }
        .is_transient());
    }
}
