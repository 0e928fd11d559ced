use std::time::Duration;
use thiserror::Error;

pub type FeResult<T> = Result<T, FeError>;

#[derive(Error, Debug)]
pub enum FeError {
    #[error("Timed out waiting for {what} ({attempts} attempts over {waited:?})")]
    TimedOut {
        what: String,
        attempts: u32,
        waited: Duration,
    },

    #[error("Invalid engine identifier: {text:?}")]
    InvalidId { text: String },

    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },
}
