// Paraff composer: grammar-constrained decoding of measures.
//
// A neural predictor proposes per-token logits; this crate makes sure every
// measure it emits parses under the measure grammar and is musically coherent
// (balanced beams, complete timewarps, voices that fill without overflowing,
// bounded chord nesting, no colliding noteheads). Two decoders share the same
// masks and collaborator seams:
//
// - guided.rs: single-path sampling with in-place repair (pop on overflow,
//   backtrack on a broken timewarp, forced close on dead ends)
// - beam.rs: branch-and-score search that rejects bad branches instead, with
//   branch expansion fanned out over rayon
//
// Supporting modules:
// - predictor.rs: `TokenPredictor` seam, chained-capacity cursor, vocabulary
//   remapping adapter
// - validator.rs: `MeasureValidator` seam and probe helpers
// - transitions.rs: token adjacency table (grammar mask)
// - guide.rs: guide masks from tail status, beam tidying, backtrack point
// - masker.rs: disposable masker for required tokens
// - options.rs: JSON-loadable decode options
// - error.rs: `ComposeError`
//
// Decoding is deterministic given a seeded `DecodeRng`, deterministic
// collaborators, and (for beam search) exact logits.

pub mod beam;
pub mod error;
pub mod guide;
pub mod guided;
pub mod masker;
pub mod options;
pub mod predictor;
pub mod transitions;
pub mod validator;

pub use beam::{ComposerBranch, compose_decisive};
pub use error::{BoxError, ComposeError};
pub use guided::compose;
pub use masker::DisposableMasker;
pub use options::{ComposeOptions, DecisiveOptions, PitchWindow};
pub use predictor::{PredictorCursor, RawPredictor, RemappedPredictor, TokenPredictor};
pub use transitions::TransitionTable;
pub use validator::MeasureValidator;
