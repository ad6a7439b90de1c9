use thiserror::Error;

/// Everything that can go wrong between the client core and the vote store.
#[derive(Error, Debug)]
pub enum PollError {
    #[error("poll not found")]
    NotFound,

    #[error("'{0}' is not one of this poll's options")]
    InvalidOption(String),

    #[error("a ballot for this poll was already cast from this client")]
    AlreadyVoted,

    #[error("a poll needs at least two options")]
    TooFewOptions,

    /// Network or server failure. Reads recover by retrying on the next
    /// sync tick; vote casts surface this once and are never auto-retried.
    #[error("vote store unavailable: {0}")]
    Transient(String),

    #[error("storage failure: {0}")]
    Storage(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for PollError {
    fn from(err: reqwest::Error) -> Self {
        PollError::Transient(err.to_string())
    }
}

impl From<std::io::Error> for PollError {
    fn from(err: std::io::Error) -> Self {
        PollError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for PollError {
    fn from(err: serde_json::Error) -> Self {
        PollError::Storage(err.to_string())
    }
}
