// Decode configuration.
//
// Plain data, deserializable from JSON with every field optional; missing
// fields take the defaults below. Runtime objects (the RNG, a disposable
// masker) are passed to the decoders separately.

use paraff_notation::Token;
use serde::{Deserialize, Serialize};

/// Step budget shared by both decoders.
pub const DEFAULT_STEP_QUOTA: usize = 512;

/// Per-step log-probability bonus in beam search.
pub const DEFAULT_STEP_AWARD: f64 = 0.04;

fn default_primer() -> Vec<Token> {
    vec![Token::Bom]
}

/// Guided (single path) sampling options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ComposeOptions {
    /// Softmax temperature. Zero or below samples greedily.
    pub temperature: f64,
    /// Consult the validator at every point where `EOM` is grammatical.
    pub parser_guide: bool,
    /// Highest staff number the measure may select (1-3).
    pub staff_limit: Option<u8>,
    /// Free-text prompt, matched word by word against `vocab`.
    pub prompt: String,
    /// The predictor's full vocabulary, for prompt lookup.
    pub vocab: Vec<String>,
    pub primer: Vec<Token>,
    pub step_quota: usize,
    /// Keep the first voice going until it fills the measure.
    pub forbid_partial: bool,
    pub forbidden_tokens: Vec<Token>,
}

impl Default for ComposeOptions {
    fn default() -> Self {
        ComposeOptions {
            temperature: 1.0,
            parser_guide: true,
            staff_limit: None,
            prompt: String::new(),
            vocab: Vec::new(),
            primer: default_primer(),
            step_quota: DEFAULT_STEP_QUOTA,
            forbid_partial: false,
            forbidden_tokens: Vec::new(),
        }
    }
}

impl ComposeOptions {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Admissible note numbers for chord pitches, inclusive, in the validator's
/// note convention. The default is the piano keyboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PitchWindow {
    pub low: i32,
    pub high: i32,
}

impl Default for PitchWindow {
    fn default() -> Self {
        PitchWindow { low: -23, high: 28 }
    }
}

impl PitchWindow {
    pub fn contains(&self, note: i32) -> bool {
        (self.low..=self.high).contains(&note)
    }
}

/// Beam search options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DecisiveOptions {
    /// Beam width.
    pub branch_n: usize,
    pub staff_limit: Option<u8>,
    pub prompt: String,
    pub vocab: Vec<String>,
    pub primer: Vec<Token>,
    pub step_quota: usize,
    pub forbid_partial: bool,
    pub forbidden_tokens: Vec<Token>,
    /// Reject branches whose tail chord leaves `pitch_window`, or that stack
    /// four octave marks in a row.
    pub limit_pitch: bool,
    pub pitch_window: PitchWindow,
    pub forbid_notehead_conflict: bool,
    pub step_award: f64,
}

impl Default for DecisiveOptions {
    fn default() -> Self {
        DecisiveOptions {
            branch_n: 1,
            staff_limit: None,
            prompt: String::new(),
            vocab: Vec::new(),
            primer: default_primer(),
            step_quota: DEFAULT_STEP_QUOTA,
            forbid_partial: false,
            forbidden_tokens: Vec::new(),
            limit_pitch: false,
            pitch_window: PitchWindow::default(),
            forbid_notehead_conflict: false,
            step_award: DEFAULT_STEP_AWARD,
        }
    }
}

impl DecisiveOptions {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
