use thiserror::Error;
use uuid::Uuid;

/// errors raised by the calculation and event-replay core
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AmortizationError {
    /// a caller-supplied value violates a precondition; nothing was mutated
    #[error("invalid argument: {message}")]
    InvalidArgument {
        message: String,
    },

    /// the operation does not apply to the current loan or event
    #[error("logic error: {message}")]
    LogicError {
        message: String,
    },

    /// an internal invariant could not be satisfied from the available data
    #[error("runtime error: {message}")]
    RuntimeError {
        message: String,
    },

    #[error("division by zero")]
    DivisionByZero,

    #[error("invalid configuration: {message}")]
    InvalidConfiguration {
        message: String,
    },

    #[error("loan not found: {id}")]
    LoanNotFound {
        id: Uuid,
    },

    #[error("serialization error: {message}")]
    Serialization {
        message: String,
    },
}

impl AmortizationError {
    pub fn invalid(message: impl Into<String>) -> Self {
        AmortizationError::InvalidArgument {
            message: message.into(),
        }
    }

    pub fn logic(message: impl Into<String>) -> Self {
        AmortizationError::LogicError {
            message: message.into(),
        }
    }

    pub fn runtime(message: impl Into<String>) -> Self {
        AmortizationError::RuntimeError {
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for AmortizationError {
    fn from(err: serde_json::Error) -> Self {
        AmortizationError::Serialization {
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AmortizationError>;
