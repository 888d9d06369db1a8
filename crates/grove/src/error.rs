//! Error types for the tree model.

/// Result type alias for tree operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building or editing a tree.
///
/// Every failure is reported before the tree is touched, so a failed call
/// leaves the model exactly as it was.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// A required input is missing or does not refer to an element of the tree.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The call is not legal in the model's current state.
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// A flat element sequence violates the depth rules.
    #[error("Invalid structure: {0}")]
    InvalidStructure(String),
}

impl Error {
    /// Create an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Create an invalid operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation(message.into())
    }

    /// Create an invalid structure error.
    pub fn invalid_structure(message: impl Into<String>) -> Self {
        Self::InvalidStructure(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::invalid_structure("first element must have depth -1");
        assert_eq!(
            err.to_string(),
            "Invalid structure: first element must have depth -1"
        );
        assert_eq!(
            Error::invalid_operation("cannot remove the root").to_string(),
            "Invalid operation: cannot remove the root"
        );
    }
}
