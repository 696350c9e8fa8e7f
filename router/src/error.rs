//! Router error types

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouterError {
    #[error("Service discovery not initialized")]
    ServiceDiscoveryNotInitialized,

    #[error("No servers available of type: {0}")]
    NoServersAvailable(String),

    #[error("No candidate servers for route: {0}")]
    EmptyCandidateSet(String),

    #[error("Server not found: {0}")]
    ServerNotFound(String),

    #[error("Service discovery error: {0}")]
    Discovery(String),

    #[error("Routing strategy error: {0}")]
    Strategy(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, RouterError>;
