// Error type for the decoding engine.
//
// Only collaborator failures are errors. Overflow, invalid timewarps,
// runaway nesting and empty masks are ordinary control flow inside the
// decoders and never surface here.

use thiserror::Error;

/// Error type carried across the predictor and validator seams.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum ComposeError {
    #[error("predictor failed")]
    Predictor(#[source] BoxError),

    #[error("validator failed on `{code}`")]
    Validator {
        code: String,
        #[source]
        source: BoxError,
    },

    #[error("no predictor can hold a {0}-token input")]
    NoPredictor(usize),
}
