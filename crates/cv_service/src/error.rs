use serde::Serialize;
use thiserror::Error;

/// Everything a vault operation can report to its caller.
///
/// `NotFound` is returned both for missing records and for records owned by
/// someone else; callers cannot tell the two apart.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VaultError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("A vault entry for this website and url already exists")]
    Conflict,

    #[error("Vault entry not found")]
    NotFound,

    #[error("Internal vault error")]
    Internal,
}

impl VaultError {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            VaultError::InvalidInput(_) => "invalid_input",
            VaultError::Conflict => "conflict",
            VaultError::NotFound => "not_found",
            VaultError::Internal => "internal",
        }
    }

    pub fn body(&self) -> ErrorBody {
        ErrorBody {
            error: self.code(),
            message: self.to_string(),
        }
    }
}

/// Serialisable error shape for the calling layer to render.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
}

pub type VaultResult<T> = Result<T, VaultError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(VaultError::InvalidInput("x".into()).code(), "invalid_input");
        assert_eq!(VaultError::Conflict.code(), "conflict");
        assert_eq!(VaultError::NotFound.code(), "not_found");
        assert_eq!(VaultError::Internal.code(), "internal");
    }

    #[test]
    fn body_carries_message() {
        let body = VaultError::NotFound.body();
        assert_eq!(body.error, "not_found");
        assert_eq!(body.message, "Vault entry not found");
    }
}
