//! Error types for channel scheduling

use thiserror::Error;

/// Channel error type
///
/// Only construction can fail. Out-of-range trim, fade and timing values are
/// normalized to safe defaults and reported through `log::warn!` instead.
#[derive(Error, Debug)]
pub enum ChannelError {
    #[error("Require an id for the channel")]
    MissingId,

    #[error("Invalid channel options: {0}")]
    Options(#[from] serde_json::Error),
}

/// Result type alias
pub type ChannelResult<T> = Result<T, ChannelError>;
