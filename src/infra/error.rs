use thiserror::Error;

use crate::{cache::CacheError, config::LoadError, events::BrokerError, search::SearchError};

/// Bootstrap failures: anything that stops the process before or while wiring adapters.
#[derive(Debug, Error)]
pub enum InfraError {
    #[error("database error: {message}")]
    Database { message: String },
    #[error("telemetry initialization failed: {0}")]
    Telemetry(String),
    #[error("configuration error: {message}")]
    Configuration { message: String },
    #[error(transparent)]
    Settings(#[from] LoadError),
    #[error("cache bootstrap failed: {0}")]
    Cache(#[from] CacheError),
    #[error("broker bootstrap failed: {0}")]
    Broker(#[from] BrokerError),
    #[error("search bootstrap failed: {0}")]
    Search(#[from] SearchError),
}

impl InfraError {
    pub fn database(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn telemetry(message: impl Into<String>) -> Self {
        Self::Telemetry(message.into())
    }
}
