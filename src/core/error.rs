use crate::validation::MessageBag;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Invalid schema: {0}")]
    InvalidSchema(String),

    #[error("Attribute '{0}' not found on model '{1}'")]
    AttributeNotFound(String, String),

    #[error("Cast error: {0}")]
    Cast(String),

    #[error("Invalid validation rule: {0}")]
    InvalidRule(String),

    #[error("Add [{0}] to fillable property to allow mass assignment on [{1}]")]
    MassAssignment(String, String),

    #[error("Validation failed for model '{model}': {errors}")]
    Validation { model: String, errors: MessageBag },

    #[error("Model '{0}' is not registered")]
    ModelNotFound(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Lock error: {0}")]
    LockError(String),
}

impl ModelError {
    /// Messages of a failed validation, if this is one.
    pub fn validation_errors(&self) -> Option<&MessageBag> {
        match self {
            Self::Validation { errors, .. } => Some(errors),
            _ => None,
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }
}

pub type Result<T> = std::result::Result<T, ModelError>;

impl<T> From<std::sync::PoisonError<T>> for ModelError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::LockError(err.to_string())
    }
}

impl From<serde_json::Error> for ModelError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidSchema(err.to_string())
    }
}
