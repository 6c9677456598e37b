//! Build-time validation errors for the estimator core.
//!
//! Per spec §7, the running core never surfaces `Result::Err` for sensor or
//! numerics problems — those become state transitions and discrete events
//! (see `events`). The only fallible operations are construction (invalid
//! tunables) and command parsing.
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("missing clock")]
    MissingClock,
    #[error("missing target_empty_g")]
    MissingTargetEmpty,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("unrecognized command: {0}")]
    Unrecognized(String),
    #[error("malformed SET_TOTAL_VOLUME value: {0}")]
    MalformedVolume(String),
}

pub type Result<T> = std::result::Result<T, BuildError>;
