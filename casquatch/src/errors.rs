use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DriverError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Mapping error: {0}")]
    Mapping(String),

    #[error("Timeout error: operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Task error: {0}")]
    Task(String),
}

impl From<scylla::errors::ExecutionError> for DriverError {
    fn from(err: scylla::errors::ExecutionError) -> Self {
        DriverError::Database(err.to_string())
    }
}

impl From<anyhow::Error> for DriverError {
    fn from(err: anyhow::Error) -> Self {
        DriverError::Database(err.to_string())
    }
}

impl From<config::ConfigError> for DriverError {
    fn from(err: config::ConfigError) -> Self {
        DriverError::Config(err.to_string())
    }
}
