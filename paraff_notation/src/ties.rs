// Tie and slur normalization for finished measures.
//
// A predictor sometimes writes a tie between chords that do not hold the same
// pitches, or writes a one-event slur where a tie was meant. `fix_ties` walks
// each voice's adjacent event pairs and corrects both cases in place, so a
// second pass over the same measure changes nothing.

use crate::document::{ExpressiveMark, Measure, Pitch};

/// Whether `next` sustains `prev`: same chord size, same letter and
/// accidental at every position, and no octave movement. The first pitch's
/// octave count is relative to `prev`, so it must be zero; later pitches are
/// relative to the pitch below and must match.
pub fn is_chord_holding(prev: &[Pitch], next: &[Pitch]) -> bool {
    prev.len() == next.len()
        && prev.iter().zip(next).enumerate().all(|(i, (p0, p1))| {
            p1.phonet == p0.phonet
                && p1.acc == p0.acc
                && if i == 0 {
                    p1.octaves == 0
                } else {
                    p1.octaves == p0.octaves
                }
        })
}

/// Drop ties that do not hold and turn holding slur pairs into ties.
/// Returns the number of changes.
pub fn fix_ties(measure: &mut Measure) -> usize {
    let mut changes = 0;

    for voice in &mut measure.voices {
        let mut events: Vec<_> = voice.events_mut().collect();
        for i in 1..events.len() {
            let (head, tail) = events.split_at_mut(i);
            let term = &mut *head[i - 1];
            let next = &mut *tail[0];
            if term.marks.is_empty() {
                continue;
            }

            let holding = is_chord_holding(&term.chord, &next.chord);
            if term.marks.contains(&ExpressiveMark::Tie) {
                if !holding {
                    term.marks.retain(|&m| m != ExpressiveMark::Tie);
                    changes += 1;
                }
            } else if holding
                && term.marks.contains(&ExpressiveMark::SlurL)
                && next.marks.contains(&ExpressiveMark::SlurR)
            {
                term.marks.retain(|&m| m != ExpressiveMark::SlurL);
                next.marks.retain(|&m| m != ExpressiveMark::SlurR);
                term.marks.push(ExpressiveMark::Tie);
                changes += 1;
            }
        }
    }

    changes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Accidental, Context, ContextTerm, EventTerm, Term, Voice};
    use crate::vocab::Token;
    use pretty_assertions::assert_eq;
    use smallvec::SmallVec;

    fn chord(pitches: &[(Token, i32)]) -> SmallVec<[Pitch; 4]> {
        pitches
            .iter()
            .map(|&(p, o)| Pitch::new(p, None, o, 0))
            .collect()
    }

    fn event(pitches: &[(Token, i32)], marks: &[ExpressiveMark]) -> Term {
        Term::Event(EventTerm {
            chord: chord(pitches),
            marks: marks.to_vec(),
            ..Default::default()
        })
    }

    fn measure(terms: Vec<Term>) -> Measure {
        Measure {
            voices: vec![Voice {
                terms,
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    fn marks(m: &Measure) -> Vec<Vec<ExpressiveMark>> {
        m.voices[0].events().map(|e| e.marks.clone()).collect()
    }

    #[test]
    fn test_holding() {
        let c_e = chord(&[(Token::C, 0), (Token::E, 0)]);
        assert!(is_chord_holding(&c_e, &c_e));
        assert!(!is_chord_holding(&c_e, &chord(&[(Token::C, 0)])));
        assert!(!is_chord_holding(&c_e, &chord(&[(Token::C, 1), (Token::E, 0)])));
        assert!(!is_chord_holding(&c_e, &chord(&[(Token::C, 0), (Token::E, 1)])));

        let mut sharp = c_e.clone();
        sharp[1].acc = Some(Accidental::Sharp);
        assert!(!is_chord_holding(&c_e, &sharp));

        // The first pitch of `prev` may carry an octave move of its own.
        let moved = chord(&[(Token::C, 2), (Token::E, 0)]);
        assert!(is_chord_holding(&moved, &c_e));
    }

    #[test]
    fn test_invalid_tie_removed() {
        let mut m = measure(vec![
            event(&[(Token::C, 0)], &[ExpressiveMark::Tie, ExpressiveMark::Accent]),
            event(&[(Token::D, 0)], &[]),
        ]);
        assert_eq!(fix_ties(&mut m), 1);
        assert_eq!(marks(&m), vec![vec![ExpressiveMark::Accent], vec![]]);
    }

    #[test]
    fn test_slur_pair_becomes_tie() {
        let mut m = measure(vec![
            event(&[(Token::G, 0)], &[ExpressiveMark::SlurL]),
            Term::Context(ContextTerm {
                context: Context::Clef { clef: Token::Cf },
                staff: 1,
                tick: 0,
            }),
            event(&[(Token::G, 0)], &[ExpressiveMark::SlurR, ExpressiveMark::Staccato]),
        ]);
        assert_eq!(fix_ties(&mut m), 1);
        assert_eq!(
            marks(&m),
            vec![vec![ExpressiveMark::Tie], vec![ExpressiveMark::Staccato]]
        );
    }

    #[test]
    fn test_slur_over_moving_notes_kept() {
        let mut m = measure(vec![
            event(&[(Token::G, 0)], &[ExpressiveMark::SlurL]),
            event(&[(Token::A, 0)], &[ExpressiveMark::SlurR]),
        ]);
        assert_eq!(fix_ties(&mut m), 0);
    }

    #[test]
    fn test_second_pass_is_noop() {
        let mut m = measure(vec![
            event(&[(Token::C, 0)], &[ExpressiveMark::Tie]),
            event(&[(Token::E, 0)], &[ExpressiveMark::SlurL]),
            event(&[(Token::E, 0)], &[ExpressiveMark::SlurR, ExpressiveMark::Tie]),
            event(&[(Token::E, 0)], &[]),
        ]);
        assert_eq!(fix_ties(&mut m), 2);
        let after = m.clone();
        assert_eq!(fix_ties(&mut m), 0);
        assert_eq!(m, after);
    }
}
