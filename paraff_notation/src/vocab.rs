// The paraff token vocabulary.
//
// Every measure is written as a sequence of tokens drawn from one fixed
// alphabet. A token's id is its position in the alphabet, and predictors emit
// one logit per id, so the order below is part of the model contract and must
// never be reshuffled. Names are the wire spelling the grammar parses.
//
// On top of the alphabet sit the semantic group tables (`TokenTable`), each an
// injective value<->token map used by serialization (e.g. duration exponent 2
// <-> `D4`). Tables are `static` and immutable; the reverse name lookup is a
// lazily built hash map, also immutable once built.
//
// See also: `mask.rs` for per-token boolean masks over this alphabet,
// `serialize.rs` for the document->token encoding that uses the tables.

use crate::error::NotationError;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

macro_rules! vocabulary {
    ($($variant:ident => $name:literal),* $(,)?) => {
        /// One symbol of the paraff alphabet. `as u8` is the token id.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[repr(u8)]
        pub enum Token {
            $($variant),*
        }

        impl Token {
            /// Every token, in id order.
            pub const ALL: &'static [Token] = &[$(Token::$variant),*];

            /// Wire name of the token.
            pub const fn name(self) -> &'static str {
                match self {
                    $(Token::$variant => $name),*
                }
            }
        }
    };
}

vocabulary! {
    // structural
    Pad => "PAD",
    Msum => "MSUM",
    Bos => "BOS",
    Eos => "EOS",
    Bom => "BOM",
    Eom => "EOM",
    Vb => "VB",

    // staff (context)
    S1 => "S1",
    S2 => "S2",
    S3 => "S3",

    // clefs (context)
    Cg => "Cg",
    Cf => "Cf",
    Cc => "Cc",

    // keys (measure level)
    K0 => "K0",
    K1 => "K1",
    K2 => "K2",
    K3 => "K3",
    K4 => "K4",
    K5 => "K5",
    K6 => "K6",
    Km1 => "K_1",
    Km2 => "K_2",
    Km3 => "K_3",
    Km4 => "K_4",
    Km5 => "K_5",
    Km6 => "K_6",

    // time signature numerators & denominators (measure level)
    Tn1 => "TN1",
    Tn2 => "TN2",
    Tn3 => "TN3",
    Tn4 => "TN4",
    Tn5 => "TN5",
    Tn6 => "TN6",
    Tn7 => "TN7",
    Tn8 => "TN8",
    Tn9 => "TN9",
    Tn10 => "TN10",
    Tn11 => "TN11",
    Tn12 => "TN12",
    Td2 => "TD2",
    Td4 => "TD4",
    Td8 => "TD8",
    Td16 => "TD16",

    // pitch letters
    A => "a",
    B => "b",
    C => "c",
    D => "d",
    E => "e",
    F => "f",
    G => "g",

    // accidentals
    As => "As",
    Af => "Af",
    Ass => "Ass",
    Aff => "Aff",

    // octave marks, then the octave-shift band (context)
    Osup => "Osup",
    Osub => "Osub",
    O0 => "O0",
    Ova => "Ova",
    Ovb => "Ovb",

    // durations
    D1 => "D1",
    D2 => "D2",
    D4 => "D4",
    D8 => "D8",
    D16 => "D16",
    D32 => "D32",
    D64 => "D64",
    D128 => "D128",
    D256 => "D256",
    Dot => "Dot",

    // beams
    Bl => "Bl",
    Br => "Br",

    // stem direction
    Mu => "Mu",
    Md => "Md",

    // rests
    Rest => "Rest",
    RSpace => "RSpace",

    // timewarps: ratio tags, irregular tag, continuation
    W2 => "W2",
    W3 => "W3",
    W4 => "W4",
    W5 => "W5",
    W6 => "W6",
    W7 => "W7",
    W8 => "W8",
    W9 => "W9",
    W10 => "W10",
    W12 => "W12",
    W16 => "W16",
    W24 => "W24",
    W32 => "W32",
    Wx => "Wx",
    W => "W",

    // grace
    Grace => "G",

    // tremolo pitchers (TM) and catchers (TC)
    Tm8 => "TM8",
    Tm16 => "TM16",
    Tm32 => "TM32",
    Tm64 => "TM64",
    Tm128 => "TM128",
    Tm256 => "TM256",
    Tc8 => "TC8",
    Tc16 => "TC16",
    Tc32 => "TC32",
    Tc64 => "TC64",
    Tc128 => "TC128",
    Tc256 => "TC256",

    // expressive marks & articulations
    ESlurL => "EslurL",
    ESlurR => "EslurR",
    ETie => "Etie",
    EArp => "Earp",
    ETr => "Etr",
    EFer => "Efer",
    ESf => "Esf",
    ESt => "Est",
    EStm => "Estm",
    EAc => "Eac",
    EMor => "Emor",
    EPr => "Epr",
    ETurn => "Eturn",
    EPor => "Epor",
    ETen => "Eten",
    EMar => "Emar",
    ECre => "Ecre",
    EDim => "Edim",
    ECds => "Ecds",
    EDf => "EDf",
    EDp => "EDp",
    EDm => "EDm",
    EDr => "EDr",
    EDs => "EDs",
    EDz => "EDz",
}

/// Number of tokens in the alphabet; predictors emit at least this many logits.
pub const VOCAB_SIZE: usize = Token::ALL.len();

static NAME_TO_TOKEN: LazyLock<FxHashMap<&'static str, Token>> =
    LazyLock::new(|| Token::ALL.iter().map(|&t| (t.name(), t)).collect());

impl Token {
    /// Numeric id (position in the alphabet).
    pub const fn id(self) -> u32 {
        self as u32
    }

    pub fn from_id(id: u32) -> Option<Token> {
        Token::ALL.get(id as usize).copied()
    }

    /// Reverse lookup by wire name.
    pub fn from_name(name: &str) -> Option<Token> {
        NAME_TO_TOKEN.get(name).copied()
    }

    /// The semantic group this token belongs to.
    pub fn group(self) -> TokenGroup {
        use Token::*;
        match self {
            Pad | Msum | Bos | Eos | Bom | Eom | Vb => TokenGroup::Structural,
            S1 | S2 | S3 => TokenGroup::Staff,
            Cg | Cf | Cc => TokenGroup::Clef,
            K0 | K1 | K2 | K3 | K4 | K5 | K6 | Km1 | Km2 | Km3 | Km4 | Km5 | Km6 => {
                TokenGroup::Key
            }
            Tn1 | Tn2 | Tn3 | Tn4 | Tn5 | Tn6 | Tn7 | Tn8 | Tn9 | Tn10 | Tn11 | Tn12 => {
                TokenGroup::Numerator
            }
            Td2 | Td4 | Td8 | Td16 => TokenGroup::Denominator,
            A | B | C | D | E | F | G => TokenGroup::Phonet,
            As | Af | Ass | Aff => TokenGroup::Accidental,
            Osup | Osub => TokenGroup::OctaveMark,
            O0 | Ova | Ovb => TokenGroup::OctaveShift,
            D1 | D2 | D4 | D8 | D16 | D32 | D64 | D128 | D256 => TokenGroup::Division,
            Dot => TokenGroup::Dot,
            Bl | Br => TokenGroup::Beam,
            Mu | Md => TokenGroup::Stem,
            Rest | RSpace => TokenGroup::Rest,
            W2 | W3 | W4 | W5 | W6 | W7 | W8 | W9 | W10 | W12 | W16 | W24 | W32 => {
                TokenGroup::Timewarp
            }
            Wx | W => TokenGroup::TimewarpControl,
            Grace => TokenGroup::Grace,
            Tm8 | Tm16 | Tm32 | Tm64 | Tm128 | Tm256 => TokenGroup::Tremolo,
            Tc8 | Tc16 | Tc32 | Tc64 | Tc128 | Tc256 => TokenGroup::TremoloCast,
            _ => TokenGroup::Mark,
        }
    }

    pub fn is_token_of(self, group: TokenGroup) -> bool {
        self.group() == group
    }

    /// Key and time-signature tokens, which apply to the whole measure.
    pub fn is_measure_level(self) -> bool {
        matches!(
            self.group(),
            TokenGroup::Key | TokenGroup::Numerator | TokenGroup::Denominator
        )
    }

    /// Leading run of ASCII uppercase letters in the name (`"TM"` for `TM16`,
    /// `"D"` for `Dot`, empty for pitch letters).
    pub fn header(self) -> &'static str {
        let name = self.name();
        let end = name
            .find(|c: char| !c.is_ascii_uppercase())
            .unwrap_or(name.len());
        &name[..end]
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Token {
    type Err = NotationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Token::from_name(s).ok_or_else(|| NotationError::UnknownToken(s.to_string()))
    }
}

impl TryFrom<u32> for Token {
    type Error = NotationError;

    fn try_from(id: u32) -> Result<Self, Self::Error> {
        Token::from_id(id).ok_or(NotationError::TokenIdOutOfRange(id))
    }
}

// Tokens travel as their wire names in JSON (transition tables, documents).
impl Serialize for Token {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for Token {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Token::from_name(&name)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown token name `{name}`")))
    }
}

// ---------------------------------------------------------------------------
// Semantic groups and value tables
// ---------------------------------------------------------------------------

/// Partition of the alphabet. Every token is in exactly one group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenGroup {
    Structural,
    Staff,
    Clef,
    Key,
    Numerator,
    Denominator,
    Phonet,
    Accidental,
    /// `Osup` / `Osub`, repeated after a pitch letter.
    OctaveMark,
    /// `O0` / `Ova` / `Ovb` context band.
    OctaveShift,
    Division,
    Dot,
    Beam,
    Stem,
    Rest,
    Timewarp,
    /// `Wx` (irregular ratio) and `W` (continue the open timewarp).
    TimewarpControl,
    Grace,
    Tremolo,
    TremoloCast,
    Mark,
}

impl TokenGroup {
    /// The value table for groups whose tokens encode a number.
    pub fn table(self) -> Option<&'static TokenTable> {
        match self {
            TokenGroup::Staff => Some(&STAFF),
            TokenGroup::Clef => Some(&CLEF),
            TokenGroup::Key => Some(&KEY),
            TokenGroup::Numerator => Some(&NUMERATOR),
            TokenGroup::Denominator => Some(&DENOMINATOR),
            TokenGroup::Division => Some(&DIVISION),
            TokenGroup::Timewarp => Some(&TIMEWARP),
            TokenGroup::OctaveShift => Some(&OCTAVE_SHIFT),
            TokenGroup::Phonet => Some(&PHONET),
            TokenGroup::Accidental => Some(&ACCIDENTAL),
            TokenGroup::Tremolo => Some(&TREMOLO),
            TokenGroup::TremoloCast => Some(&TREMOLO_CAST),
            _ => None,
        }
    }

    /// All tokens of this group, in id order.
    pub fn tokens(self) -> impl Iterator<Item = Token> {
        Token::ALL.iter().copied().filter(move |t| t.group() == self)
    }
}

/// Injective map between a small integer and a token.
#[derive(Debug)]
pub struct TokenTable {
    entries: &'static [(i32, Token)],
}

impl TokenTable {
    const fn new(entries: &'static [(i32, Token)]) -> Self {
        TokenTable { entries }
    }

    pub fn token(&self, value: i32) -> Option<Token> {
        self.entries
            .iter()
            .find(|(v, _)| *v == value)
            .map(|&(_, t)| t)
    }

    pub fn value(&self, token: Token) -> Option<i32> {
        self.entries
            .iter()
            .find(|(_, t)| *t == token)
            .map(|&(v, _)| v)
    }

    pub fn contains(&self, token: Token) -> bool {
        self.value(token).is_some()
    }

    pub fn entries(&self) -> &'static [(i32, Token)] {
        self.entries
    }
}

/// Staff number (1-based).
pub static STAFF: TokenTable = TokenTable::new(&[(1, Token::S1), (2, Token::S2), (3, Token::S3)]);

/// Clef by the staff-line offset of its reference note.
pub static CLEF: TokenTable = TokenTable::new(&[(0, Token::Cc), (-3, Token::Cg), (3, Token::Cf)]);

/// Key signature in fifths: positive sharps, negative flats.
pub static KEY: TokenTable = TokenTable::new(&[
    (0, Token::K0),
    (1, Token::K1),
    (2, Token::K2),
    (3, Token::K3),
    (4, Token::K4),
    (5, Token::K5),
    (6, Token::K6),
    (-1, Token::Km1),
    (-2, Token::Km2),
    (-3, Token::Km3),
    (-4, Token::Km4),
    (-5, Token::Km5),
    (-6, Token::Km6),
]);

pub static NUMERATOR: TokenTable = TokenTable::new(&[
    (1, Token::Tn1),
    (2, Token::Tn2),
    (3, Token::Tn3),
    (4, Token::Tn4),
    (5, Token::Tn5),
    (6, Token::Tn6),
    (7, Token::Tn7),
    (8, Token::Tn8),
    (9, Token::Tn9),
    (10, Token::Tn10),
    (11, Token::Tn11),
    (12, Token::Tn12),
]);

pub static DENOMINATOR: TokenTable = TokenTable::new(&[
    (2, Token::Td2),
    (4, Token::Td4),
    (8, Token::Td8),
    (16, Token::Td16),
]);

/// Duration division exponent: value n means a 1/2^n note.
pub static DIVISION: TokenTable = TokenTable::new(&[
    (0, Token::D1),
    (1, Token::D2),
    (2, Token::D4),
    (3, Token::D8),
    (4, Token::D16),
    (5, Token::D32),
    (6, Token::D64),
    (7, Token::D128),
    (8, Token::D256),
]);

/// Timewarp tag by its ratio denominator.
pub static TIMEWARP: TokenTable = TokenTable::new(&[
    (2, Token::W2),
    (3, Token::W3),
    (4, Token::W4),
    (5, Token::W5),
    (6, Token::W6),
    (7, Token::W7),
    (8, Token::W8),
    (9, Token::W9),
    (10, Token::W10),
    (12, Token::W12),
    (16, Token::W16),
    (24, Token::W24),
    (32, Token::W32),
]);

pub static OCTAVE_SHIFT: TokenTable =
    TokenTable::new(&[(0, Token::O0), (-1, Token::Ova), (1, Token::Ovb)]);

/// Tremolo stroke exponent (3 = eighth strokes).
pub static TREMOLO: TokenTable = TokenTable::new(&[
    (3, Token::Tm8),
    (4, Token::Tm16),
    (5, Token::Tm32),
    (6, Token::Tm64),
    (7, Token::Tm128),
    (8, Token::Tm256),
]);

pub static TREMOLO_CAST: TokenTable = TokenTable::new(&[
    (3, Token::Tc8),
    (4, Token::Tc16),
    (5, Token::Tc32),
    (6, Token::Tc64),
    (7, Token::Tc128),
    (8, Token::Tc256),
]);

/// Pitch letter by diatonic step from C.
pub static PHONET: TokenTable = TokenTable::new(&[
    (0, Token::C),
    (1, Token::D),
    (2, Token::E),
    (3, Token::F),
    (4, Token::G),
    (5, Token::A),
    (6, Token::B),
]);

pub static ACCIDENTAL: TokenTable = TokenTable::new(&[
    (1, Token::As),
    (2, Token::Ass),
    (-1, Token::Af),
    (-2, Token::Aff),
]);

/// Value of a token in whichever table holds it.
pub fn token_value(token: Token) -> Option<i32> {
    token.group().table().and_then(|t| t.value(token))
}

// ---------------------------------------------------------------------------
// Prompt descriptors
// ---------------------------------------------------------------------------

/// Free-text descriptor words a predictor can be conditioned on.
///
/// These live in the predictor's extended vocabulary (after the alphabet),
/// never in a generated sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptToken {
    SingleStaff,
    DoubleStaff,
    TripleStaff,
    PolyVoice,
    MonoVoice,
    Rhythm1,
    Rhythm2,
    Rhythm4,
    Rhythm8,
    Rhythm16,
    Rhythm32,
    Rhythm64,
    Grace,
    NoGrace,
    Tremolo,
    NoTremolo,
    Timewarp,
    NoTimewarp,
    Dot,
    NoDot,
    OctaveShift,
    NoOctaveShift,
    Partial,
    Full,
    Patched,
    Complicated,
    CrossStaves,
}

impl PromptToken {
    pub const ALL: [PromptToken; 27] = [
        PromptToken::SingleStaff,
        PromptToken::DoubleStaff,
        PromptToken::TripleStaff,
        PromptToken::PolyVoice,
        PromptToken::MonoVoice,
        PromptToken::Rhythm1,
        PromptToken::Rhythm2,
        PromptToken::Rhythm4,
        PromptToken::Rhythm8,
        PromptToken::Rhythm16,
        PromptToken::Rhythm32,
        PromptToken::Rhythm64,
        PromptToken::Grace,
        PromptToken::NoGrace,
        PromptToken::Tremolo,
        PromptToken::NoTremolo,
        PromptToken::Timewarp,
        PromptToken::NoTimewarp,
        PromptToken::Dot,
        PromptToken::NoDot,
        PromptToken::OctaveShift,
        PromptToken::NoOctaveShift,
        PromptToken::Partial,
        PromptToken::Full,
        PromptToken::Patched,
        PromptToken::Complicated,
        PromptToken::CrossStaves,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PromptToken::SingleStaff => "#single-staff",
            PromptToken::DoubleStaff => "#double-staff",
            PromptToken::TripleStaff => "#triple-staff",
            PromptToken::PolyVoice => "#polyvoice",
            PromptToken::MonoVoice => "#monovoice",
            PromptToken::Rhythm1 => "#1st-rhythm",
            PromptToken::Rhythm2 => "#2nd-rhythm",
            PromptToken::Rhythm4 => "#4th-rhythm",
            PromptToken::Rhythm8 => "#8th-rhythm",
            PromptToken::Rhythm16 => "#16th-rhythm",
            PromptToken::Rhythm32 => "#32th-rhythm",
            PromptToken::Rhythm64 => "#64th-rhythm",
            PromptToken::Grace => "#grace",
            PromptToken::NoGrace => "#non-grace",
            PromptToken::Tremolo => "#tremolo",
            PromptToken::NoTremolo => "#non-tremolo",
            PromptToken::Timewarp => "#timewarp",
            PromptToken::NoTimewarp => "#non-timewarp",
            PromptToken::Dot => "#dot",
            PromptToken::NoDot => "#non-dot",
            PromptToken::OctaveShift => "#octave-shift",
            PromptToken::NoOctaveShift => "#non-octave-shift",
            PromptToken::Partial => "#partial",
            PromptToken::Full => "#full",
            PromptToken::Patched => "#patched",
            PromptToken::Complicated => "#complicated",
            PromptToken::CrossStaves => "#cross-staves",
        }
    }

    pub fn from_word(word: &str) -> Option<PromptToken> {
        PromptToken::ALL.into_iter().find(|p| p.as_str() == word)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alphabet_order_is_stable() {
        assert_eq!(Token::Pad.id(), 0);
        assert_eq!(Token::Bom.id(), 4);
        assert_eq!(Token::Eom.id(), 5);
        assert_eq!(Token::Vb.id(), 6);
        assert_eq!(Token::EDz.id() as usize, VOCAB_SIZE - 1);
        for (i, t) in Token::ALL.iter().enumerate() {
            assert_eq!(t.id() as usize, i);
        }
    }

    #[test]
    fn test_name_lookup_roundtrip() {
        for &t in Token::ALL {
            assert_eq!(Token::from_name(t.name()), Some(t));
            assert_eq!(Token::from_id(t.id()), Some(t));
        }
        assert_eq!(Token::from_name("K_3"), Some(Token::Km3));
        assert_eq!(Token::from_name("c"), Some(Token::C));
        assert_eq!(Token::from_name("nope"), None);
        assert!(Token::from_id(VOCAB_SIZE as u32).is_none());
        assert!("zz".parse::<Token>().is_err());
    }

    #[test]
    fn test_tables_match_groups() {
        for group in [
            TokenGroup::Staff,
            TokenGroup::Clef,
            TokenGroup::Key,
            TokenGroup::Numerator,
            TokenGroup::Denominator,
            TokenGroup::Division,
            TokenGroup::Timewarp,
            TokenGroup::OctaveShift,
            TokenGroup::Phonet,
            TokenGroup::Accidental,
            TokenGroup::Tremolo,
            TokenGroup::TremoloCast,
        ] {
            let table = group.table().unwrap();
            let members: Vec<Token> = group.tokens().collect();
            assert_eq!(table.entries().len(), members.len(), "{group:?}");
            for t in members {
                let v = table.value(t).unwrap();
                assert_eq!(table.token(v), Some(t));
            }
        }
    }

    #[test]
    fn test_token_value() {
        assert_eq!(token_value(Token::D4), Some(2));
        assert_eq!(token_value(Token::Km2), Some(-2));
        assert_eq!(token_value(Token::C), Some(0));
        assert_eq!(token_value(Token::B), Some(6));
        assert_eq!(token_value(Token::Dot), None);
        assert_eq!(token_value(Token::Wx), None);
    }

    #[test]
    fn test_headers() {
        assert_eq!(Token::Tm16.header(), "TM");
        assert_eq!(Token::Dot.header(), "D");
        assert_eq!(Token::EDf.header(), "ED");
        assert_eq!(Token::ESlurL.header(), "E");
        assert_eq!(Token::C.header(), "");
        assert_eq!(Token::Km1.header(), "K");
    }

    #[test]
    fn test_measure_level() {
        assert!(Token::K3.is_measure_level());
        assert!(Token::Tn6.is_measure_level());
        assert!(Token::Td8.is_measure_level());
        assert!(!Token::S1.is_measure_level());
    }

    #[test]
    fn test_prompt_words() {
        for p in PromptToken::ALL {
            assert_eq!(PromptToken::from_word(p.as_str()), Some(p));
        }
        assert_eq!(PromptToken::from_word("#nothing"), None);
    }

    #[test]
    fn test_token_serde_uses_names() {
        let json = serde_json::to_string(&vec![Token::Bom, Token::Km1, Token::Eom]).unwrap();
        assert_eq!(json, r#"["BOM","K_1","EOM"]"#);
        let back: Vec<Token> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, vec![Token::Bom, Token::Km1, Token::Eom]);
        assert!(serde_json::from_str::<Token>(r#""Q9""#).is_err());
    }
}
