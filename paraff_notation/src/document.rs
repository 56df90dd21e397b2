// The measure document model.
//
// A `Measure` is what the grammar validator hands back after parsing a token
// sequence: measure-level key and time signature, one `Voice` per staff line,
// and a `TailStatus` summarizing the trailing state of the (possibly
// unfinished) sequence. The decoder only reads these structures; the
// post-processing passes in `ties.rs` mutate marks on finished measures.
//
// Field names follow the validator's JSON (camelCase), so a validator running
// out of process can answer with `Measure::from_json`.
//
// Term layout:
// - `Term::Event`: a chord, rest or invisible rest with duration and flags
// - `Term::Context`: staff/key/time/clef/octave-shift change, scoped forward
//   within the voice

use crate::error::NotationError;
use crate::fraction::Fraction;
use crate::vocab::Token;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Accidental {
    #[serde(rename = "s")]
    Sharp,
    #[serde(rename = "f")]
    Flat,
    #[serde(rename = "ss")]
    DoubleSharp,
    #[serde(rename = "ff")]
    DoubleFlat,
}

impl Accidental {
    pub fn token(self) -> Token {
        match self {
            Accidental::Sharp => Token::As,
            Accidental::Flat => Token::Af,
            Accidental::DoubleSharp => Token::Ass,
            Accidental::DoubleFlat => Token::Aff,
        }
    }
}

/// One notehead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pitch {
    /// Pitch letter token (`a`..`g`).
    pub phonet: Token,
    #[serde(default)]
    pub acc: Option<Accidental>,
    /// Signed count of `Osup`/`Osub` marks. For the first pitch of a chord
    /// this is relative to the previous event; for the rest, to the pitch
    /// below.
    #[serde(default)]
    pub octaves: i32,
    /// Absolute note height, in the validator's note-number convention.
    #[serde(default)]
    pub note: i32,
}

impl Pitch {
    pub fn new(phonet: Token, acc: Option<Accidental>, octaves: i32, note: i32) -> Self {
        Pitch {
            phonet,
            acc,
            octaves,
            note,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Duration {
    /// Division exponent: the event is a 1/2^division note.
    pub division: u8,
    pub dots: u8,
    pub time_warp: Option<Fraction>,
    /// The timewarp tag written before the division (`W3`, `Wx`, `W`, ...).
    pub tw: Option<Token>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Beam {
    #[serde(rename = "Bl")]
    Open,
    #[serde(rename = "Br")]
    Close,
}

impl Beam {
    pub fn token(self) -> Token {
        match self {
            Beam::Open => Token::Bl,
            Beam::Close => Token::Br,
        }
    }
}

/// Explicit stem tag written in the sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stem {
    #[serde(rename = "Mu")]
    Up,
    #[serde(rename = "Md")]
    Down,
}

impl Stem {
    pub fn token(self) -> Token {
        match self {
            Stem::Up => Token::Mu,
            Stem::Down => Token::Md,
        }
    }
}

/// Resolved stem direction after engraving rules, used for collision keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StemDirection {
    #[serde(rename = "u")]
    Up,
    #[serde(rename = "d")]
    Down,
    #[serde(rename = "-")]
    Free,
}

impl StemDirection {
    pub const ALL: [StemDirection; 3] = [StemDirection::Free, StemDirection::Up, StemDirection::Down];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExpressiveMark {
    #[serde(rename = "slurL")]
    SlurL,
    #[serde(rename = "slurR")]
    SlurR,
    #[serde(rename = "tie")]
    Tie,
    #[serde(rename = "arp")]
    Arpeggio,
    #[serde(rename = "tr")]
    Trill,
    #[serde(rename = "fer")]
    Fermata,
    #[serde(rename = "sf")]
    ShortFermata,
    #[serde(rename = "st")]
    Staccato,
    #[serde(rename = "stm")]
    Staccatissimo,
    #[serde(rename = "ac")]
    Accent,
    #[serde(rename = "mor")]
    Mordent,
    #[serde(rename = "pr")]
    Prall,
    #[serde(rename = "turn")]
    Turn,
    #[serde(rename = "por")]
    Portato,
    #[serde(rename = "ten")]
    Tenuto,
    #[serde(rename = "mar")]
    Marcato,
    #[serde(rename = "cre")]
    Crescendo,
    #[serde(rename = "dim")]
    Diminuendo,
    #[serde(rename = "cds")]
    CreDimStop,
    #[serde(rename = "Df")]
    Forte,
    #[serde(rename = "Dp")]
    Piano,
    #[serde(rename = "Dm")]
    Mezzo,
    #[serde(rename = "Dr")]
    Rinforzando,
    #[serde(rename = "Ds")]
    Sforzando,
    #[serde(rename = "Dz")]
    Z,
}

impl ExpressiveMark {
    pub fn token(self) -> Token {
        match self {
            ExpressiveMark::SlurL => Token::ESlurL,
            ExpressiveMark::SlurR => Token::ESlurR,
            ExpressiveMark::Tie => Token::ETie,
            ExpressiveMark::Arpeggio => Token::EArp,
            ExpressiveMark::Trill => Token::ETr,
            ExpressiveMark::Fermata => Token::EFer,
            ExpressiveMark::ShortFermata => Token::ESf,
            ExpressiveMark::Staccato => Token::ESt,
            ExpressiveMark::Staccatissimo => Token::EStm,
            ExpressiveMark::Accent => Token::EAc,
            ExpressiveMark::Mordent => Token::EMor,
            ExpressiveMark::Prall => Token::EPr,
            ExpressiveMark::Turn => Token::ETurn,
            ExpressiveMark::Portato => Token::EPor,
            ExpressiveMark::Tenuto => Token::ETen,
            ExpressiveMark::Marcato => Token::EMar,
            ExpressiveMark::Crescendo => Token::ECre,
            ExpressiveMark::Diminuendo => Token::EDim,
            ExpressiveMark::CreDimStop => Token::ECds,
            ExpressiveMark::Forte => Token::EDf,
            ExpressiveMark::Piano => Token::EDp,
            ExpressiveMark::Mezzo => Token::EDm,
            ExpressiveMark::Rinforzando => Token::EDr,
            ExpressiveMark::Sforzando => Token::EDs,
            ExpressiveMark::Z => Token::EDz,
        }
    }
}

/// A sounding or silent event.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EventTerm {
    /// Noteheads bottom-up. Rests and spaces carry one placeholder pitch.
    pub chord: SmallVec<[Pitch; 4]>,
    pub duration: Option<Duration>,
    pub rest: bool,
    /// Invisible rest.
    pub space: bool,
    pub beam: Option<Beam>,
    pub ill_beam: bool,
    pub stem: Option<Stem>,
    pub time_warp: Option<Fraction>,
    pub time_warp_end: bool,
    pub grace: bool,
    /// Tremolo stroke exponent of a single-note tremolo (`TM*`).
    pub tremolo: Option<i32>,
    /// Set on the first event of a measured tremolo pair.
    pub tremolo_pitcher: Option<i32>,
    /// Set on the second event of a measured tremolo pair (`TC*`).
    pub tremolo_catcher: Option<i32>,
    pub staff: u8,
    pub tick: i64,
    pub stem_direction: Option<StemDirection>,
    pub marks: Vec<ExpressiveMark>,
}

/// Non-sounding change scoped forward within its voice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Context {
    Staff {
        staff: u8,
    },
    Key {
        key: i32,
    },
    TimeSignature {
        #[serde(rename = "timeSig")]
        time_sig: Fraction,
    },
    Clef {
        clef: Token,
    },
    OctaveShift {
        #[serde(rename = "octaveShift")]
        octave_shift: Token,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextTerm {
    pub context: Context,
    #[serde(default)]
    pub staff: u8,
    #[serde(default)]
    pub tick: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Term {
    // Context must be tried first: every field of an event is optional.
    Context(ContextTerm),
    Event(EventTerm),
}

impl Term {
    pub fn as_event(&self) -> Option<&EventTerm> {
        match self {
            Term::Event(e) => Some(e),
            Term::Context(_) => None,
        }
    }

    pub fn as_event_mut(&mut self) -> Option<&mut EventTerm> {
        match self {
            Term::Event(e) => Some(e),
            Term::Context(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Voice {
    pub staff: u8,
    pub octave_shift_in: Option<Token>,
    pub octave_shift_out: Option<Token>,
    pub head_clef: Option<Token>,
    pub terms: Vec<Term>,
    /// Accumulated event time as a fraction of a whole note.
    pub events_time: Fraction,
    pub compensated_grace_time: Option<Fraction>,
    pub partial: bool,
}

impl Voice {
    pub fn events(&self) -> impl Iterator<Item = &EventTerm> {
        self.terms.iter().filter_map(Term::as_event)
    }

    pub fn events_mut(&mut self) -> impl Iterator<Item = &mut EventTerm> {
        self.terms.iter_mut().filter_map(Term::as_event_mut)
    }
}

/// Semantic summary of the trailing state of a (possibly partial) measure.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TailStatus {
    /// A timewarp is open at the tail.
    pub time_warping: bool,
    pub invalid_timewarp: bool,
    /// The open timewarp has not yet covered its full span.
    pub incomplete_time_warping: bool,
    pub beam_open: bool,
    /// -1 partial, 0 exactly full, 1 overflowing, `None` unknown.
    pub filling: Option<i8>,
    pub empty_staff: bool,
    /// Chord of the last event, when there is one.
    pub chord: Option<Vec<Pitch>>,
}

impl TailStatus {
    pub fn overflowing(&self) -> bool {
        self.filling.is_some_and(|f| f > 0)
    }

    pub fn full(&self) -> bool {
        self.filling == Some(0)
    }

    pub fn partial(&self) -> bool {
        self.filling.is_some_and(|f| f < 0)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Measure {
    pub key: i32,
    pub time_sig: Fraction,
    pub is_partial: bool,
    pub default_compensated_grace_time: Fraction,
    pub staff_n: u8,
    pub voices: Vec<Voice>,
    pub ill: bool,
    pub tail_status: TailStatus,
    pub descriptors: Vec<String>,
}

impl Measure {
    pub fn from_json(json: &str) -> Result<Self, NotationError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, NotationError> {
        Ok(serde_json::to_string(self)?)
    }
}
