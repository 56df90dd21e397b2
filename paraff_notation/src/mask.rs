// Per-token boolean masks over the vocabulary.
//
// A `TokenMask` is a fixed 128-bit set indexed by token id. The decoder keeps
// several of them alive at once (grammar row, guide masks, forbidden list,
// disposable masker) and combines them on every step, so combination is a
// word-wise AND rather than a walk over per-token arrays.

use crate::vocab::{Token, TokenGroup, VOCAB_SIZE};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

const WORDS: usize = 2;

const _: () = assert!(VOCAB_SIZE <= WORDS * 64, "vocabulary outgrew TokenMask");

/// Set of admissible tokens.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TokenMask {
    bits: [u64; WORDS],
}

impl TokenMask {
    /// No token admitted.
    pub const fn empty() -> Self {
        TokenMask { bits: [0; WORDS] }
    }

    /// Every vocabulary token admitted.
    pub fn full() -> Self {
        let mut mask = Self::empty();
        for &t in Token::ALL {
            mask.allow(t);
        }
        mask
    }

    pub fn from_tokens<I: IntoIterator<Item = Token>>(tokens: I) -> Self {
        let mut mask = Self::empty();
        for t in tokens {
            mask.allow(t);
        }
        mask
    }

    pub fn contains(&self, token: Token) -> bool {
        let id = token.id() as usize;
        self.bits[id / 64] & (1 << (id % 64)) != 0
    }

    pub fn allow(&mut self, token: Token) {
        let id = token.id() as usize;
        self.bits[id / 64] |= 1 << (id % 64);
    }

    pub fn forbid(&mut self, token: Token) {
        let id = token.id() as usize;
        self.bits[id / 64] &= !(1 << (id % 64));
    }

    pub fn set(&mut self, token: Token, allowed: bool) {
        if allowed {
            self.allow(token);
        } else {
            self.forbid(token);
        }
    }

    pub fn forbid_group(&mut self, group: TokenGroup) {
        for t in group.tokens() {
            self.forbid(t);
        }
    }

    /// Intersection.
    pub fn and(&self, other: &TokenMask) -> TokenMask {
        let mut bits = self.bits;
        for (b, o) in bits.iter_mut().zip(other.bits) {
            *b &= o;
        }
        TokenMask { bits }
    }

    /// Intersection of any number of masks.
    pub fn all_of<'a, I: IntoIterator<Item = &'a TokenMask>>(masks: I) -> TokenMask {
        masks
            .into_iter()
            .fold(TokenMask::full(), |acc, m| acc.and(m))
    }

    /// Tokens in `self` that are not in `other`.
    pub fn without(&self, other: &TokenMask) -> TokenMask {
        let mut bits = self.bits;
        for (b, o) in bits.iter_mut().zip(other.bits) {
            *b &= !o;
        }
        TokenMask { bits }
    }

    pub fn count(&self) -> usize {
        self.bits.iter().map(|w| w.count_ones() as usize).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.iter().all(|&w| w == 0)
    }

    /// Admitted tokens in id order.
    pub fn iter(&self) -> impl Iterator<Item = Token> + '_ {
        Token::ALL.iter().copied().filter(|&t| self.contains(t))
    }
}

impl std::fmt::Debug for TokenMask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.iter().map(Token::name)).finish()
    }
}

impl FromIterator<Token> for TokenMask {
    fn from_iter<I: IntoIterator<Item = Token>>(iter: I) -> Self {
        TokenMask::from_tokens(iter)
    }
}

// Serialized as the list of admitted token names.
impl Serialize for TokenMask {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

impl<'de> Deserialize<'de> for TokenMask {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let tokens = Vec::<Token>::deserialize(deserializer)?;
        Ok(TokenMask::from_tokens(tokens))
    }
}
