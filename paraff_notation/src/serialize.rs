// Document -> token encoding.
//
// The grammar validator parses token text into a `Measure`; this module is
// the inverse direction, used by the post-processing passes and the CLI to
// re-emit a (possibly corrected) measure. Field order inside an event is
// fixed:
//
//   grace | tremolo | tremolo-cast, stem, pitches, timewarp tag, division,
//   dots, space | rest, beam, marks
//
// Values that have no token in their table (a tremolo exponent of 2, a staff
// index of 0) are skipped rather than failing the whole measure.

use crate::document::{Context, ContextTerm, EventTerm, Measure, Pitch, Term, Voice};
use crate::vocab::{
    DENOMINATOR, DIVISION, KEY, NUMERATOR, STAFF, TREMOLO, TREMOLO_CAST, Token,
};

pub fn serialize_pitch(pitch: &Pitch, out: &mut Vec<Token>) {
    out.push(pitch.phonet);
    if let Some(acc) = pitch.acc {
        out.push(acc.token());
    }

    let mark = if pitch.octaves > 0 {
        Token::Osup
    } else {
        Token::Osub
    };
    out.extend(std::iter::repeat_n(mark, pitch.octaves.unsigned_abs() as usize));
}

pub fn serialize_context(term: &ContextTerm, out: &mut Vec<Token>) {
    match term.context {
        Context::Staff { staff } => out.extend(STAFF.token(i32::from(staff))),
        Context::Key { key } => out.extend(KEY.token(key)),
        Context::TimeSignature { time_sig } => {
            let (Ok(n), Ok(d)) = (
                i32::try_from(time_sig.numerator),
                i32::try_from(time_sig.denominator),
            ) else {
                return;
            };
            out.extend(NUMERATOR.token(n));
            out.extend(DENOMINATOR.token(d));
        }
        Context::Clef { clef } => out.push(clef),
        Context::OctaveShift { octave_shift } => out.push(octave_shift),
    }
}

pub fn serialize_event(event: &EventTerm, out: &mut Vec<Token>) {
    if event.grace {
        out.push(Token::Grace);
    } else if let Some(tremolo) = event.tremolo {
        out.extend(TREMOLO.token(tremolo));
    } else if let Some(catcher) = event.tremolo_catcher {
        out.extend(TREMOLO_CAST.token(catcher));
    }

    if let Some(stem) = event.stem {
        out.push(stem.token());
    }

    for pitch in &event.chord {
        serialize_pitch(pitch, out);
    }

    if let Some(duration) = &event.duration {
        if let Some(tw) = duration.tw {
            out.push(tw);
        }
        out.extend(DIVISION.token(i32::from(duration.division)));
        out.extend(std::iter::repeat_n(Token::Dot, duration.dots as usize));
    }

    if event.space {
        out.push(Token::RSpace);
    } else if event.rest {
        out.push(Token::Rest);
    }

    if let Some(beam) = event.beam {
        out.push(beam.token());
    }

    out.extend(event.marks.iter().map(|m| m.token()));
}

pub fn serialize_term(term: &Term, out: &mut Vec<Token>) {
    match term {
        Term::Event(event) => serialize_event(event, out),
        Term::Context(context) => serialize_context(context, out),
    }
}

pub fn serialize_voice(voice: &Voice) -> Vec<Token> {
    let mut out = Vec::new();
    for term in &voice.terms {
        serialize_term(term, &mut out);
    }
    out
}

/// `BOM voice0 VB voice1 ... EOM`.
pub fn serialize_measure(measure: &Measure) -> Vec<Token> {
    let mut out = vec![Token::Bom];
    for (i, voice) in measure.voices.iter().enumerate() {
        if i > 0 {
            out.push(Token::Vb);
        }
        for term in &voice.terms {
            serialize_term(term, &mut out);
        }
    }
    out.push(Token::Eom);
    out
}
