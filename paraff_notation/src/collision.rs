// Notehead collision check.
//
// Two independently voiced noteheads on the same staff, at the same tick, on
// the same note and with the same stem direction cannot be told apart once
// engraved. Every non-grace, non-space event claims a position key per
// notehead; any key claimed twice is a collision. Events without a resolved
// stem direction claim nothing.
//
// With `check_rest`, a rest claims the two notes either side of its head for
// every stem direction, so a rest crowding a notehead also counts.

use crate::document::{Measure, StemDirection};
use rustc_hash::FxHashSet;

type PositionKey = (u8, i64, i32, StemDirection);

#[derive(Debug, Clone, Copy, Default)]
pub struct CollisionOptions {
    pub check_rest: bool,
}

pub fn check_notehead_conflict(measure: &Measure, options: CollisionOptions) -> bool {
    let mut positions: FxHashSet<PositionKey> = FxHashSet::default();

    for voice in &measure.voices {
        for event in voice.events() {
            if event.grace || event.space {
                continue;
            }

            if options.check_rest && event.rest {
                let Some(head) = event.chord.first() else {
                    continue;
                };
                for dn in -2..=2 {
                    for dir in StemDirection::ALL {
                        if !positions.insert((event.staff, event.tick, head.note + dn, dir)) {
                            return true;
                        }
                    }
                }
                continue;
            }

            let Some(dir) = event.stem_direction else {
                continue;
            };
            for pitch in &event.chord {
                if !positions.insert((event.staff, event.tick, pitch.note, dir)) {
                    return true;
                }
            }
        }
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{EventTerm, Pitch, Term, Voice};
    use crate::vocab::Token;
    use smallvec::smallvec;

    fn event(note: i32, dir: Option<StemDirection>) -> EventTerm {
        EventTerm {
            chord: smallvec![Pitch::new(Token::C, None, 0, note)],
            staff: 1,
            tick: 0,
            stem_direction: dir,
            ..Default::default()
        }
    }

    fn two_voices(a: EventTerm, b: EventTerm) -> Measure {
        Measure {
            voices: vec![
                Voice {
                    terms: vec![Term::Event(a)],
                    ..Default::default()
                },
                Voice {
                    terms: vec![Term::Event(b)],
                    ..Default::default()
                },
            ],
            ..Default::default()
        }
    }

    #[test]
    fn test_same_stem_collides() {
        let m = two_voices(
            event(60, Some(StemDirection::Up)),
            event(60, Some(StemDirection::Up)),
        );
        assert!(check_notehead_conflict(&m, CollisionOptions::default()));
    }

    #[test]
    fn test_opposite_stems_do_not_collide() {
        let m = two_voices(
            event(60, Some(StemDirection::Up)),
            event(60, Some(StemDirection::Down)),
        );
        assert!(!check_notehead_conflict(&m, CollisionOptions::default()));
    }

    #[test]
    fn test_grace_space_and_unstemmed_are_ignored() {
        let mut grace = event(60, Some(StemDirection::Up));
        grace.grace = true;
        let m = two_voices(grace, event(60, Some(StemDirection::Up)));
        assert!(!check_notehead_conflict(&m, CollisionOptions::default()));

        let mut space = event(60, Some(StemDirection::Up));
        space.space = true;
        let m = two_voices(event(60, Some(StemDirection::Up)), space);
        assert!(!check_notehead_conflict(&m, CollisionOptions::default()));

        let m = two_voices(event(60, None), event(60, None));
        assert!(!check_notehead_conflict(&m, CollisionOptions::default()));
    }

    #[test]
    fn test_rest_widening() {
        let mut rest = event(58, None);
        rest.rest = true;
        let m = two_voices(rest, event(60, Some(StemDirection::Down)));
        assert!(!check_notehead_conflict(&m, CollisionOptions::default()));
        assert!(check_notehead_conflict(&m, CollisionOptions { check_rest: true }));

        let mut far_rest = event(50, None);
        far_rest.rest = true;
        let m = two_voices(far_rest, event(60, Some(StemDirection::Down)));
        assert!(!check_notehead_conflict(&m, CollisionOptions { check_rest: true }));
    }

    #[test]
    fn test_different_tick_or_staff() {
        let mut later = event(60, Some(StemDirection::Up));
        later.tick = 480;
        let m = two_voices(event(60, Some(StemDirection::Up)), later);
        assert!(!check_notehead_conflict(&m, CollisionOptions::default()));

        let mut lower = event(60, Some(StemDirection::Up));
        lower.staff = 2;
        let m = two_voices(event(60, Some(StemDirection::Up)), lower);
        assert!(!check_notehead_conflict(&m, CollisionOptions::default()));
    }
}
