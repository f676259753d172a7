use thiserror::Error;

use crate::{
    application::{repos::RepoError, stores::StoreError},
    domain::error::DomainError,
    infra::error::InfraError,
    search::SearchError,
};

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error(transparent)]
    Search(#[from] SearchError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, AppError::Domain(DomainError::NotFound { .. }))
    }

    pub fn is_not_owner(&self) -> bool {
        matches!(self, AppError::Domain(DomainError::NotOwner { .. }))
    }
}

impl From<StoreError> for AppError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::Domain(err) => AppError::Domain(err),
            StoreError::Repo(err) => AppError::Repo(err),
        }
    }
}
