// Token adjacency table.
//
// For every token, the set of tokens the measure grammar allows directly
// after it. This is the first and cheapest mask in both decoders, consulted
// on every step before any predictor or validator call. It is data, not
// code: either loaded from JSON (`{"BOM": ["c", "S1", ...], ...}`) or learned
// by observing valid sentences, since every adjacent pair in a valid measure
// is by definition admissible.

use paraff_notation::{Token, TokenMask, VOCAB_SIZE};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionTable {
    rows: Vec<TokenMask>,
}

impl Default for TransitionTable {
    fn default() -> Self {
        TransitionTable {
            rows: vec![TokenMask::empty(); VOCAB_SIZE],
        }
    }
}

impl TransitionTable {
    /// Table admitting every adjacent pair seen in `sentences`.
    pub fn from_sentences<'a, I>(sentences: I) -> Self
    where
        I: IntoIterator<Item = &'a [Token]>,
    {
        let mut table = TransitionTable::default();
        for sentence in sentences {
            table.learn(sentence);
        }
        table
    }

    pub fn learn(&mut self, sentence: &[Token]) {
        for pair in sentence.windows(2) {
            self.allow(pair[0], pair[1]);
        }
    }

    pub fn allow(&mut self, prev: Token, next: Token) {
        self.rows[prev.id() as usize].allow(next);
    }

    /// Tokens admissible after `prev`.
    pub fn row(&self, prev: Token) -> &TokenMask {
        &self.rows[prev.id() as usize]
    }

    pub fn allows(&self, prev: Token, next: Token) -> bool {
        self.row(prev).contains(next)
    }

    /// Every adjacent pair of `tokens` is admissible.
    pub fn conforms(&self, tokens: &[Token]) -> bool {
        tokens.windows(2).all(|p| self.allows(p[0], p[1]))
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

// Serialized as a map from token name to admissible next names; empty rows
// are omitted.
impl Serialize for TransitionTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(
            Token::ALL
                .iter()
                .zip(&self.rows)
                .filter(|(_, row)| !row.is_empty()),
        )
    }
}

impl<'de> Deserialize<'de> for TransitionTable {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let map = BTreeMap::<Token, TokenMask>::deserialize(deserializer)?;
        let mut table = TransitionTable::default();
        for (prev, row) in map {
            table.rows[prev.id() as usize] = row;
        }
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use paraff_notation::sequence::parse_code_tokens;

    #[test]
    fn test_learn_pairs() {
        let a = parse_code_tokens("BOM c D4 EOM");
        let b = parse_code_tokens("BOM c D8 c D8 EOM");
        let table = TransitionTable::from_sentences([a.as_slice(), b.as_slice()]);

        assert!(table.allows(Token::Bom, Token::C));
        assert!(table.allows(Token::D8, Token::C));
        assert!(table.allows(Token::D8, Token::Eom));
        assert!(!table.allows(Token::D4, Token::C));
        assert!(table.row(Token::Eom).is_empty());
        assert!(table.conforms(&parse_code_tokens("BOM c D8 c D4 EOM")));
        assert!(!table.conforms(&parse_code_tokens("BOM D4 EOM")));
    }

    #[test]
    fn test_json_shape() {
        let mut table = TransitionTable::default();
        table.allow(Token::Bom, Token::C);
        table.allow(Token::Bom, Token::S1);
        table.allow(Token::C, Token::D4);
        let json = table.to_json().unwrap();
        assert_eq!(json, r#"{"BOM":["S1","c"],"c":["D4"]}"#);
        assert_eq!(TransitionTable::from_json(&json).unwrap(), table);
    }

    #[test]
    fn test_unknown_name_rejected() {
        assert!(TransitionTable::from_json(r#"{"BOM": ["Q7"]}"#).is_err());
    }
}
