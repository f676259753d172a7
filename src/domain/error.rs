use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("domain entity `{entity}` not found")]
    NotFound { entity: &'static str },
    #[error("user does not own `{entity}`")]
    NotOwner { entity: &'static str },
    #[error("update for `{entity}` carries no fields")]
    EmptyUpdate { entity: &'static str },
    #[error("domain validation failed: {message}")]
    Validation { message: String },
}

impl DomainError {
    pub fn not_found(entity: &'static str) -> Self {
        Self::NotFound { entity }
    }

    pub fn not_owner(entity: &'static str) -> Self {
        Self::NotOwner { entity }
    }

    pub fn empty_update(entity: &'static str) -> Self {
        Self::EmptyUpdate { entity }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}
