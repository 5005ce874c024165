//! Error types for the simulation harness.

use opinion_core::GraphError;
use thiserror::Error;

/// Errors that can occur while configuring or driving a simulation.
#[derive(Debug, Error)]
pub enum SimError {
    /// Graph store, snapshot or entity failure
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// Configuration file unreadable or values out of range
    #[error("Config error: {0}")]
    Config(String),
}

impl SimError {
    /// Creates a config error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, SimError>;
