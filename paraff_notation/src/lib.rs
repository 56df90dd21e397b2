// Paraff notation: the token alphabet and the measure document model.
//
// A measure of music notation is written as a flat sequence of tokens from a
// fixed alphabet (`BOM ... VB ... EOM`). This crate owns everything about
// that representation that does not involve a predictor: the alphabet and its
// value tables, masks over it, exact fractions for musical time, the measure
// document a grammar validator produces, and the passes that run on finished
// measures.
//
// Architecture:
// - vocab.rs: Token alphabet (id order is a model contract), semantic groups,
//   value<->token tables, prompt descriptor words
// - mask.rs: 128-bit admissibility masks over the alphabet
// - fraction.rs: Rational arithmetic tolerant of float noise from JSON
// - document.rs: Measure / Voice / Term / TailStatus (validator JSON shape)
// - serialize.rs: Measure -> tokens in fixed field order
// - sequence.rs: Token text, voice split/join, padding, score descriptors
// - collision.rs: Notehead collision check across voices
// - ties.rs: Tie/slur normalization on finished measures
// - error.rs: `NotationError`

pub mod collision;
pub mod document;
pub mod error;
pub mod fraction;
pub mod mask;
pub mod sequence;
pub mod serialize;
pub mod ties;
pub mod vocab;

pub use document::{Measure, TailStatus, Term, Voice};
pub use error::NotationError;
pub use fraction::Fraction;
pub use mask::TokenMask;
pub use vocab::{Token, TokenGroup, VOCAB_SIZE};
