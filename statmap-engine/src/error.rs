use thiserror::Error;
use tokio::task::JoinError;

use statmap_config::ConfigError;
use statmap_core::registry::PinError;
use statmap_core::CountError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Pin registry error: {0}")]
    Pin(#[from] PinError),

    #[error("Counter table error: {0}")]
    Count(#[from] CountError),

    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("Unit worker failed: {0}")]
    Worker(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<JoinError> for EngineError {
    fn from(err: JoinError) -> Self {
        EngineError::Worker(err.to_string())
    }
}
