// Deterministic, portable pseudo-random number generator for token sampling.
//
// Implements xoshiro256++ (Blackman & Vigna, 2019) with SplitMix64 seeding,
// plus the discrete draws the decoder needs on top of it:
// - `choose`: categorical draw over non-negative weights
// - `choose_logits`: categorical draw weighted by exp(logit), i.e. sampling
//   from softmax(logits) without materializing the normalized distribution
//
// A decode call owns its `DecodeRng`. Seeding two generators identically
// reproduces the same token stream given the same logits, which is what the
// composer tests rely on. The floating-point draws are reproducible on one
// platform; cross-platform bit-identical logits are not a goal.

use serde::{Deserialize, Serialize};

/// Xoshiro256++ PRNG used by the guided sampler.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DecodeRng {
    s: [u64; 4],
}

impl DecodeRng {
    /// Create a new PRNG seeded from a `u64`.
    ///
    /// Uses SplitMix64 to expand the seed into the 256-bit internal state.
    pub fn new(seed: u64) -> Self {
        let mut sm = seed;
        Self {
            s: [
                splitmix64(&mut sm),
                splitmix64(&mut sm),
                splitmix64(&mut sm),
                splitmix64(&mut sm),
            ],
        }
    }

    /// Generate the next `u64` in the sequence.
    pub fn next_u64(&mut self) -> u64 {
        let result = (self.s[0].wrapping_add(self.s[3]))
            .rotate_left(23)
            .wrapping_add(self.s[0]);

        let t = self.s[1] << 17;

        self.s[2] ^= self.s[0];
        self.s[3] ^= self.s[1];
        self.s[1] ^= self.s[2];
        self.s[0] ^= self.s[3];

        self.s[2] ^= t;
        self.s[3] = self.s[3].rotate_left(45);

        result
    }

    /// Generate a uniform `f64` in [0, 1) from the upper 53 bits.
    pub fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Draw an index with probability proportional to `weights[i]`.
    ///
    /// Non-positive and non-finite weights are never chosen. Returns `None`
    /// when no weight is positive.
    pub fn choose(&mut self, weights: &[f64]) -> Option<usize> {
        let usable = |w: f64| w.is_finite() && w > 0.0;
        let sum: f64 = weights.iter().copied().filter(|&w| usable(w)).sum();
        if sum <= 0.0 {
            return None;
        }

        let mut roll = sum * self.next_f64();
        let mut last = None;
        for (i, &w) in weights.iter().enumerate() {
            if !usable(w) {
                continue;
            }
            if roll < w {
                return Some(i);
            }
            roll -= w;
            last = Some(i);
        }

        // Rounding can leave a sliver of `roll` past the final weight.
        last
    }

    /// Draw an index from softmax(`logits`).
    ///
    /// Entries equal to negative infinity have zero probability. The maximum
    /// finite logit is subtracted before exponentiation so very sharp
    /// distributions (low temperature) do not overflow. Returns `None` when
    /// no logit is finite.
    pub fn choose_logits(&mut self, logits: &[f64]) -> Option<usize> {
        let max = logits
            .iter()
            .copied()
            .filter(|l| l.is_finite())
            .fold(f64::NEG_INFINITY, f64::max);
        if !max.is_finite() {
            return None;
        }

        let weights: Vec<f64> = logits
            .iter()
            .map(|&l| if l.is_finite() { (l - max).exp() } else { 0.0 })
            .collect();
        self.choose(&weights)
    }
}

/// SplitMix64, used only for seeding xoshiro256++ from a single `u64`.
fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9e37_79b9_7f4a_7c15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}
