//! Error types for the URI layer.
//!
//! Errors at this level are purely syntactic. Whether a scheme has a wrapper
//! behind it is a question for the registry, not for this crate.

/// Errors produced while checking a scheme.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UriError {
    /// The input starts with `://`.
    EmptyScheme { input: String },

    /// The scheme contains a character outside `[A-Za-z0-9+.-]`.
    InvalidScheme { scheme: String, character: char },
}

impl std::fmt::Display for UriError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UriError::EmptyScheme { input } => write!(f, "'{}' has an empty scheme", input),
            UriError::InvalidScheme { scheme, character } => {
                write!(
                    f,
                    "scheme '{}' contains invalid character {:?}",
                    scheme, character
                )
            }
        }
    }
}

impl std::error::Error for UriError {}
