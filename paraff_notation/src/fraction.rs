// Exact rational arithmetic for time signatures, tuplet ratios and durations.
//
// Operands arrive from the validator as JSON numbers and may carry floating
// rounding noise, so `Fraction::reduced` rounds both parts to the nearest
// integer first. `gcd` on non-integers is logged and answered with 1 so one
// bad value never stops generation; the result is then simply unreduced.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};
use tracing::error;

/// A rational number. Values built with `reduced` are in lowest terms with a
/// positive denominator; zero is `0/1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fraction {
    pub numerator: i64,
    pub denominator: i64,
}

impl Fraction {
    /// Build without reducing.
    pub const fn new(numerator: i64, denominator: i64) -> Self {
        Fraction {
            numerator,
            denominator,
        }
    }

    pub const fn zero() -> Self {
        Fraction::new(0, 1)
    }

    /// Round both parts to integers, then divide out their gcd.
    pub fn reduced(numerator: f64, denominator: f64) -> Self {
        let mut n = numerator.round();
        let mut d = denominator.round();
        if d < 0.0 {
            n = -n;
            d = -d;
        }

        let g = if n != 0.0 { gcd(n.abs(), d) } else { d };
        let g = if g == 0.0 { 1.0 } else { g };

        Fraction::new((n / g) as i64, (d / g) as i64)
    }

    pub fn value(self) -> f64 {
        self.numerator as f64 / self.denominator as f64
    }

    pub fn is_zero(self) -> bool {
        self.numerator == 0
    }

    pub fn subtract(self, other: Fraction) -> Fraction {
        self + Fraction::new(-other.numerator, other.denominator)
    }
}

impl Default for Fraction {
    fn default() -> Self {
        Fraction::zero()
    }
}

impl Add for Fraction {
    type Output = Fraction;

    /// Sum over the common denominator lcm(d1, d2).
    fn add(self, rhs: Fraction) -> Fraction {
        let d1 = self.denominator as f64;
        let d2 = rhs.denominator as f64;
        let sum_d = lcm(d1, d2);
        let sum_n = self.numerator as f64 * sum_d / d1 + rhs.numerator as f64 * sum_d / d2;

        Fraction::reduced(sum_n, sum_d)
    }
}

impl Sub for Fraction {
    type Output = Fraction;

    fn sub(self, rhs: Fraction) -> Fraction {
        Fraction::subtract(self, rhs)
    }
}

impl fmt::Display for Fraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

/// Greatest common divisor of two integral floats.
///
/// Non-integer operands are logged and yield 1.
pub fn gcd(a: f64, b: f64) -> f64 {
    if a.fract() != 0.0 || b.fract() != 0.0 || !a.is_finite() || !b.is_finite() {
        error!(a, b, "non-integer gcd");
        return 1.0;
    }

    let (mut a, mut b) = (a, b);
    while b != 0.0 {
        (a, b) = (b, a % b);
    }
    a
}

pub fn lcm(a: f64, b: f64) -> f64 {
    let d = gcd(a, b);
    if d == 0.0 {
        return 0.0;
    }
    a * b / d
}

/// Multiply `value` by a fraction; `None` leaves it unscaled.
pub fn scale(value: f64, fraction: Option<Fraction>) -> f64 {
    match fraction {
        Some(f) => value * f.numerator as f64 / f.denominator as f64,
        None => value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int_gcd(a: i64, b: i64) -> i64 {
        if b == 0 { a.abs() } else { int_gcd(b, a % b) }
    }

    #[test]
    fn test_reduced_lowest_terms() {
        for n in -24..=24 {
            for d in 1..=24 {
                let f = Fraction::reduced(n as f64, d as f64);
                assert!(f.denominator > 0, "{n}/{d} -> {f}");
                if n == 0 {
                    assert_eq!(f, Fraction::zero());
                } else {
                    assert_eq!(int_gcd(f.numerator, f.denominator), 1, "{n}/{d} -> {f}");
                    assert_eq!(f.numerator * d, n * f.denominator);
                }
            }
        }
    }

    #[test]
    fn test_reduced_rounds_noise() {
        assert_eq!(Fraction::reduced(2.0000001, 7.9999999), Fraction::new(1, 4));
        assert_eq!(Fraction::reduced(3.0, -6.0), Fraction::new(-1, 2));
    }

    #[test]
    fn test_gcd_non_integer_is_one() {
        assert_eq!(gcd(2.5, 4.0), 1.0);
        assert_eq!(gcd(12.0, 18.0), 6.0);
        assert_eq!(gcd(7.0, 0.0), 7.0);
    }

    #[test]
    fn test_lcm() {
        assert_eq!(lcm(4.0, 6.0), 12.0);
        assert_eq!(lcm(8.0, 8.0), 8.0);
    }

    #[test]
    fn test_add_subtract_inverse() {
        let samples = [
            Fraction::new(1, 4),
            Fraction::new(3, 8),
            Fraction::new(2, 3),
            Fraction::new(5, 16),
            Fraction::new(-1, 6),
            Fraction::zero(),
        ];
        for &a in &samples {
            for &b in &samples {
                let a_reduced = Fraction::reduced(a.numerator as f64, a.denominator as f64);
                assert_eq!((a + b) - b, a_reduced, "({a} + {b}) - {b}");
            }
        }
    }

    #[test]
    fn test_add_values() {
        assert_eq!(Fraction::new(1, 4) + Fraction::new(1, 4), Fraction::new(1, 2));
        assert_eq!(Fraction::new(1, 3) + Fraction::new(1, 6), Fraction::new(1, 2));
        assert_eq!(Fraction::new(3, 4) - Fraction::new(3, 4), Fraction::zero());
    }

    #[test]
    fn test_scale() {
        assert_eq!(scale(1920.0, Some(Fraction::new(2, 3))), 1280.0);
        assert_eq!(scale(480.0, None), 480.0);
    }
}
