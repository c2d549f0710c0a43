use thiserror::Error;

/// Validation failures for domain values.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ModelError {
    #[error("{kind} must not be empty")]
    EmptyId { kind: &'static str },

    #[error("invalid vote option: {0}")]
    InvalidOption(String),
}
