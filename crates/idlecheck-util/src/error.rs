//! Error types for idlecheck

use thiserror::Error;

use crate::ParticipantId;

/// Top-level error type for the idle-check plugin
#[derive(Debug, Error)]
pub enum IdleCheckError {
    #[error("Participant not found: {0}")]
    ParticipantNotFound(ParticipantId),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Store error: {0}")]
    StoreError(String),

    #[error("Transport error: {0}")]
    TransportError(String),

    #[error("Scheduler is shut down")]
    ShutDown,
}

impl IdleCheckError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn store(msg: impl Into<String>) -> Self {
        Self::StoreError(msg.into())
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        Self::TransportError(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, IdleCheckError>;
