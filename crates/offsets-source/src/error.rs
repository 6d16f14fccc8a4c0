use crate::consumer::ConsumerState;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Connectivity error: {0}")]
    Connectivity(String),

    #[error("Topic not found: {0}")]
    TopicNotFound(String),

    #[error("Failed to open stream for partition {partition}: {reason}")]
    OpenStream { partition: i32, reason: String },

    #[error("Stream error on partition {partition}: {reason}")]
    Stream { partition: i32, reason: String },

    #[error("Cannot {operation} while consumer is {state}")]
    InvalidState {
        operation: &'static str,
        state: ConsumerState,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, Error>;
