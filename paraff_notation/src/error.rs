// Error type for the notation crate.
//
// Only the edges of the crate can fail: turning names or ids from outside
// into tokens, and reading documents from JSON. Everything downstream of a
// successfully built `Measure` is infallible.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotationError {
    #[error("unknown token name `{0}`")]
    UnknownToken(String),

    #[error("token id {0} is outside the vocabulary")]
    TokenIdOutOfRange(u32),

    #[error("malformed measure document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
