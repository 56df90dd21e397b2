// Disposable masker: steer guided sampling towards required tokens.
//
// The caller names tokens that must eventually appear (say `D16` and `Etr`).
// Until each one is emitted, every other token of the same name-prefix class
// is forbidden: `D16` pending blocks `D4`, `D8`, `Dot` (prefix "D"), so the
// only way to write a duration is the required one. Once every required
// token has been emitted the masker admits everything.
//
// Repairs can take emitted tokens back out of the sequence (an overflow pop,
// a timewarp backtrack, a forced close). `rewind` re-derives the pending set
// from what the sequence still holds.

use paraff_notation::{Token, TokenMask};

#[derive(Debug, Clone)]
pub struct DisposableMasker {
    required: TokenMask,
    pending: TokenMask,
    mask: TokenMask,
}

impl DisposableMasker {
    pub fn new<I: IntoIterator<Item = Token>>(required: I) -> Self {
        let required = TokenMask::from_tokens(required);
        let mut masker = DisposableMasker {
            required,
            pending: required,
            mask: TokenMask::full(),
        };
        masker.update_mask();
        masker
    }

    fn update_mask(&mut self) {
        let headers: Vec<&str> = self
            .pending
            .iter()
            .map(Token::header)
            .filter(|h| !h.is_empty())
            .collect();

        self.mask = Token::ALL
            .iter()
            .copied()
            .filter(|&t| {
                self.pending.contains(t) || !headers.iter().any(|h| t.name().starts_with(h))
            })
            .collect();
    }

    pub fn mask(&self) -> &TokenMask {
        &self.mask
    }

    /// Record an emitted token.
    pub fn next_token(&mut self, token: Token) {
        if self.pending.contains(token) {
            self.pending.forbid(token);
            self.update_mask();
        }
    }

    /// Reset after `tokens` was truncated: a required token is pending again
    /// unless the sequence still contains it.
    pub fn rewind(&mut self, tokens: &[Token]) {
        let pending = self.required.without(&TokenMask::from_tokens(tokens.iter().copied()));
        if pending != self.pending {
            self.pending = pending;
            self.update_mask();
        }
    }

    /// Every required token has been emitted.
    pub fn disposed(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_class_blocked() {
        let masker = DisposableMasker::new([Token::D16]);
        let mask = masker.mask();
        assert!(mask.contains(Token::D16));
        assert!(!mask.contains(Token::D4));
        assert!(!mask.contains(Token::Dot));
        assert!(mask.contains(Token::C));
        assert!(mask.contains(Token::Eom));
        assert!(!masker.disposed());
    }

    #[test]
    fn test_lowercase_required_tokens_block_nothing() {
        let masker = DisposableMasker::new([Token::C]);
        assert_eq!(*masker.mask(), TokenMask::full());
    }

    #[test]
    fn test_disposes_after_emission() {
        let mut masker = DisposableMasker::new([Token::D16, Token::ETr]);
        assert!(!masker.mask().contains(Token::ESt));

        masker.next_token(Token::C);
        masker.next_token(Token::D16);
        assert!(masker.mask().contains(Token::D4));
        assert!(!masker.mask().contains(Token::ESt));
        assert!(!masker.disposed());

        masker.next_token(Token::ETr);
        assert!(masker.disposed());
        assert_eq!(*masker.mask(), TokenMask::full());
    }

    #[test]
    fn test_rewind_restores_removed_requirement() {
        let mut masker = DisposableMasker::new([Token::D16, Token::ETr]);
        masker.next_token(Token::D16);
        masker.next_token(Token::ETr);
        assert!(masker.disposed());

        // D16 was popped again; ETr survived.
        masker.rewind(&[Token::Bom, Token::C, Token::ETr]);
        assert!(!masker.disposed());
        assert!(!masker.mask().contains(Token::D4));
        assert!(masker.mask().contains(Token::ESt));

        masker.rewind(&[Token::Bom, Token::C, Token::D16, Token::ETr]);
        assert!(masker.disposed());
    }
}
