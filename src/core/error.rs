use thiserror::Error;

use super::types::EntityId;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SweepError {
    /// The API rejected a write with the configured retry-safe signal
    /// (edit contention, e.g. `failed-save`).
    #[error("Transient write conflict ({signal}): {info}")]
    TransientWriteConflict { signal: String, info: String },

    /// Any other failure envelope returned by the API.
    #[error("API error {code}: {info}")]
    Remote {
        code: String,
        info: String,
        warnings: Option<String>,
    },

    /// Envelope without `success` and without `error`.
    #[error("Request was not successful: {0}")]
    Unsuccessful(String),

    #[error("Entity '{0}' not found")]
    EntityNotFound(EntityId),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(String),

    /// A batch chunk task died without producing a result.
    #[error("Chunk task failed: {0}")]
    Chunk(String),
}

impl SweepError {
    /// Builds the error for a failure envelope, classifying `code` against the
    /// retry-safe conflict signal.
    pub fn from_envelope(
        code: impl Into<String>,
        info: impl Into<String>,
        warnings: Option<String>,
        conflict_signal: &str,
    ) -> Self {
        let code = code.into();
        let info = info.into();
        if code == conflict_signal {
            Self::TransientWriteConflict { signal: code, info }
        } else {
            Self::Remote {
                code,
                info,
                warnings,
            }
        }
    }

    /// The retry signal carried by a transient conflict, if any.
    pub fn conflict_signal(&self) -> Option<&str> {
        match self {
            Self::TransientWriteConflict { signal, .. } => Some(signal.as_str()),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, SweepError>;

impl From<reqwest::Error> for SweepError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for SweepError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

impl From<std::io::Error> for SweepError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
