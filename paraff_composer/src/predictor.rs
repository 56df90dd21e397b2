// Token predictor seam and the cursor that chains predictors.
//
// A predictor is any model that turns a prompt plus the measure written so
// far into one logit per alphabet token. Each instance has a fixed input
// capacity (`n_seq`); a decode call owns a `PredictorCursor` over an ordered
// list of instances and moves to the next one whenever the growing input no
// longer fits. Cursors are per call and never shared.
//
// `RemappedPredictor` adapts a model trained on a different token ordering:
// it speaks raw ids in its own vocabulary and the adapter translates ids on
// the way in and logits on the way out.

use crate::error::{BoxError, ComposeError};
use paraff_notation::vocab::{Token, VOCAB_SIZE};

pub trait TokenPredictor: Send + Sync {
    /// Maximum input length, descriptors included.
    fn n_seq(&self) -> usize;

    /// Logits for the next token, indexed by token id. `descriptors` are
    /// prompt ids in the predictor's own vocabulary. Entries past the
    /// alphabet are ignored; missing entries count as inadmissible.
    fn deduce(&self, descriptors: &[u32], tokens: &[Token]) -> Result<Vec<f64>, BoxError>;
}

impl<T: TokenPredictor + ?Sized> TokenPredictor for Box<T> {
    fn n_seq(&self) -> usize {
        (**self).n_seq()
    }

    fn deduce(&self, descriptors: &[u32], tokens: &[Token]) -> Result<Vec<f64>, BoxError> {
        (**self).deduce(descriptors, tokens)
    }
}

/// Explicit cursor over an ordered list of predictors.
#[derive(Debug)]
pub struct PredictorCursor<'a, P> {
    predictors: &'a [P],
    index: usize,
}

impl<'a, P: TokenPredictor> PredictorCursor<'a, P> {
    /// Start at the first predictor that can hold `len` input ids.
    pub fn new(predictors: &'a [P], len: usize) -> Result<Self, ComposeError> {
        let mut cursor = PredictorCursor {
            predictors,
            index: 0,
        };
        cursor.fit(len);
        if cursor.current().is_none() {
            return Err(ComposeError::NoPredictor(len));
        }
        Ok(cursor)
    }

    /// The active predictor, or `None` once the list is exhausted.
    pub fn current(&self) -> Option<&'a P> {
        self.predictors.get(self.index)
    }

    /// Advance past every predictor too small for `len` input ids.
    pub fn fit(&mut self, len: usize) {
        while self.current().is_some_and(|p| len > p.n_seq()) {
            self.index += 1;
        }
    }
}

/// A model addressed by raw ids in its own vocabulary order.
pub trait RawPredictor: Send + Sync {
    fn n_seq(&self) -> usize;

    fn deduce_ids(&self, ids: &[u32]) -> Result<Vec<f64>, BoxError>;
}

pub struct RemappedPredictor<R> {
    inner: R,
    /// Position of each alphabet token in the model's vocabulary.
    positions: Vec<Option<u32>>,
}

impl<R: RawPredictor> RemappedPredictor<R> {
    pub fn new<S: AsRef<str>>(inner: R, vocab: &[S]) -> Self {
        let positions = Token::ALL
            .iter()
            .map(|t| {
                vocab
                    .iter()
                    .position(|w| w.as_ref() == t.name())
                    .map(|i| i as u32)
            })
            .collect();
        RemappedPredictor { inner, positions }
    }

    fn position(&self, token: Token) -> Option<u32> {
        self.positions[token.id() as usize]
    }
}

impl<R: RawPredictor> TokenPredictor for RemappedPredictor<R> {
    fn n_seq(&self) -> usize {
        self.inner.n_seq()
    }

    fn deduce(&self, descriptors: &[u32], tokens: &[Token]) -> Result<Vec<f64>, BoxError> {
        let mut ids = descriptors.to_vec();
        for &t in tokens {
            let id = self
                .position(t)
                .ok_or_else(|| format!("token `{t}` is not in the predictor vocabulary"))?;
            ids.push(id);
        }

        let scores = self.inner.deduce_ids(&ids)?;
        let mut logits = vec![f64::NEG_INFINITY; VOCAB_SIZE];
        for (logit, pos) in logits.iter_mut().zip(&self.positions) {
            if let Some(&s) = pos.and_then(|p| scores.get(p as usize)) {
                *logit = s;
            }
        }
        Ok(logits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Fixed(usize);

    impl TokenPredictor for Fixed {
        fn n_seq(&self) -> usize {
            self.0
        }

        fn deduce(&self, _: &[u32], _: &[Token]) -> Result<Vec<f64>, BoxError> {
            Ok(vec![0.0; VOCAB_SIZE])
        }
    }

    #[test]
    fn test_cursor_skips_small_predictors() {
        let chain = [Fixed(2), Fixed(4), Fixed(8)];
        let mut cursor = PredictorCursor::new(&chain, 3).unwrap();
        assert_eq!(cursor.current().unwrap().n_seq(), 4);
        cursor.fit(4);
        assert_eq!(cursor.current().unwrap().n_seq(), 4);
        cursor.fit(5);
        assert_eq!(cursor.current().unwrap().n_seq(), 8);
        cursor.fit(9);
        assert!(cursor.current().is_none());
    }

    #[test]
    fn test_cursor_no_predictor_fits() {
        let chain = [Fixed(2)];
        assert!(matches!(
            PredictorCursor::new(&chain, 3),
            Err(ComposeError::NoPredictor(3))
        ));
    }

    /// Echoes its input ids as scores at positions 0..n.
    struct Recording {
        seen: Mutex<Vec<u32>>,
    }

    impl RawPredictor for Recording {
        fn n_seq(&self) -> usize {
            16
        }

        fn deduce_ids(&self, ids: &[u32]) -> Result<Vec<f64>, BoxError> {
            *self.seen.lock().unwrap() = ids.to_vec();
            Ok(vec![1.0, 2.0, 3.0])
        }
    }

    #[test]
    fn test_remapped_ids_and_logits() {
        let vocab = ["EOM", "c", "BOM"];
        let remapped = RemappedPredictor::new(
            Recording {
                seen: Mutex::new(Vec::new()),
            },
            &vocab,
        );
        let logits = remapped.deduce(&[7], &[Token::Bom, Token::C]).unwrap();
        assert_eq!(*remapped.inner.seen.lock().unwrap(), vec![7, 2, 1]);

        assert_eq!(logits.len(), VOCAB_SIZE);
        assert_eq!(logits[Token::Eom.id() as usize], 1.0);
        assert_eq!(logits[Token::C.id() as usize], 2.0);
        assert_eq!(logits[Token::Bom.id() as usize], 3.0);
        assert_eq!(logits[Token::D4.id() as usize], f64::NEG_INFINITY);

        assert!(remapped.deduce(&[], &[Token::D4]).is_err());
    }
}
