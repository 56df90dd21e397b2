// Grammar validator seam.
//
// The validator is the external parser for the measure grammar. Given token
// text for any well-formed prefix closed with `EOM` it returns the parsed
// `Measure`, whose `TailStatus` is the only semantic feedback the decoders
// get. It must be deterministic; the decoders call it many times per measure.

use crate::error::{BoxError, ComposeError};
use paraff_notation::vocab::Token;
use paraff_notation::{Measure, TailStatus};

pub trait MeasureValidator: Send + Sync {
    fn parse(&self, code: &str) -> Result<Measure, BoxError>;
}

impl<T: MeasureValidator + ?Sized> MeasureValidator for Box<T> {
    fn parse(&self, code: &str) -> Result<Measure, BoxError> {
        (**self).parse(code)
    }
}

/// Space-joined token names, optionally followed by `tail`.
pub fn code_text(tokens: &[Token], tail: Option<Token>) -> String {
    let mut code = String::with_capacity(tokens.len() * 4);
    for t in tokens.iter().chain(tail.as_ref()) {
        if !code.is_empty() {
            code.push(' ');
        }
        code.push_str(t.name());
    }
    code
}

pub fn validate<V: MeasureValidator + ?Sized>(
    validator: &V,
    tokens: &[Token],
    tail: Option<Token>,
) -> Result<Measure, ComposeError> {
    let code = code_text(tokens, tail);
    validator
        .parse(&code)
        .map_err(|source| ComposeError::Validator { code, source })
}

/// Parse `tokens` as if closed with `EOM` right now.
pub fn probe_tail<V: MeasureValidator + ?Sized>(
    validator: &V,
    tokens: &[Token],
) -> Result<TailStatus, ComposeError> {
    Ok(validate(validator, tokens, Some(Token::Eom))?.tail_status)
}

/// Whether a sequence ending at a voice boundary has a broken timewarp. A
/// trailing `VB` is read as `EOM`.
pub fn timewarp_invalid<V: MeasureValidator + ?Sized>(
    validator: &V,
    tokens: &[Token],
) -> Result<bool, ComposeError> {
    let measure = match tokens.split_last() {
        Some((Token::Vb, body)) => validate(validator, body, Some(Token::Eom))?,
        _ => validate(validator, tokens, None)?,
    };
    Ok(measure.tail_status.invalid_timewarp)
}
