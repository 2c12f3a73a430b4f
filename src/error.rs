//! Error kinds raised while building states, operators and circuits.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, QsimError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum QsimError {
    /// Malformed input: state token, vector length, pattern.
    #[error("Format error: {0}")]
    Format(String),

    /// Incompatible shapes between matrices, vectors or oracle inputs.
    #[error("Dimension mismatch in {context}: expected {expected}, got {actual}")]
    Dimension {
        context: String,
        expected: usize,
        actual: usize,
    },

    /// Bit layout the compiler cannot express, e.g. non-contiguous targets.
    #[error("Unsupported layout: {0}")]
    UnsupportedLayout(String),

    /// Qubit count above the supported ceiling.
    #[error("Requested {requested} qubits, at most {max} are supported")]
    Domain { requested: usize, max: usize },
}

impl QsimError {
    pub fn format(msg: impl Into<String>) -> Self {
        Self::Format(msg.into())
    }

    pub fn dimension(context: impl Into<String>, expected: usize, actual: usize) -> Self {
        Self::Dimension {
            context: context.into(),
            expected,
            actual,
        }
    }

    pub fn layout(msg: impl Into<String>) -> Self {
        Self::UnsupportedLayout(msg.into())
    }

    pub fn domain(requested: usize, max: usize) -> Self {
        Self::Domain { requested, max }
    }
}
