// Guide masks and sequence surgery shared by both decoders.
//
// The grammar mask only knows adjacency. Guide masks add what the validator
// knows about the measure as a whole: a beam left open must close before the
// voice ends, a full voice takes no more notes, an unfinished timewarp must
// complete before the voice ends. They are rebuilt from the `TailStatus` at
// every point where `EOM` is grammatical and reset at each voice boundary.

use paraff_notation::vocab::{STAFF, TokenGroup};
use paraff_notation::{TailStatus, Token, TokenMask};

/// Nesting limit for tokens written without reaching an `EOM`-admissible
/// point (runaway chords from a misbehaving predictor).
pub const MAX_EVENT_STACK: u32 = 20;

/// Guide state at the start of every voice: no timewarp continuation, no
/// beam close, and no staff beyond `staff_limit`.
pub fn initial_guide_mask(staff_limit: Option<u8>) -> TokenMask {
    let mut mask = TokenMask::full();
    mask.forbid(Token::W);
    mask.forbid(Token::Br);
    if let Some(limit) = staff_limit {
        for &(staff, token) in STAFF.entries() {
            if staff > i32::from(limit) {
                mask.forbid(token);
            }
        }
    }
    mask
}

pub fn mask_from_status(status: &TailStatus) -> TokenMask {
    let mut mask = TokenMask::full();

    mask.forbid(if status.beam_open { Token::Bl } else { Token::Br });

    if !status.time_warping {
        mask.forbid(Token::W);
    }

    if status.full() {
        if status.incomplete_time_warping {
            mask.forbid(Token::Vb);
            mask.forbid(Token::Eom);
        } else {
            mask.forbid_group(TokenGroup::Phonet);
            mask.forbid_group(TokenGroup::Division);
            mask.forbid_group(TokenGroup::Stem);
            mask.forbid_group(TokenGroup::TremoloCast);
            mask.forbid(Token::Dot);
            mask.forbid(Token::Grace);
        }
    }

    mask
}

/// Complement of the caller's forbidden list.
pub fn forbidden_mask(forbidden: &[Token]) -> TokenMask {
    TokenMask::full().without(&TokenMask::from_tokens(forbidden.iter().copied()))
}

/// Prompt ids: each word case-folded and looked up in `vocab`. Unknown words
/// and the vocabulary's id 0 are dropped.
pub fn prompt_descriptors(prompt: &str, vocab: &[String]) -> Vec<u32> {
    prompt
        .split_whitespace()
        .filter_map(|word| {
            let word = word.to_lowercase();
            vocab.iter().position(|w| *w == word)
        })
        .filter(|&i| i > 0)
        .map(|i| i as u32)
        .collect()
}

/// Remove beam openings after the last beam close, when the validator last
/// reported a beam still open.
pub fn tidy_beam(tokens: &mut Vec<Token>, last_status: Option<&TailStatus>) {
    if !last_status.is_some_and(|s| s.beam_open) {
        return;
    }

    loop {
        let bl = tokens.iter().rposition(|&t| t == Token::Bl);
        let br = tokens.iter().rposition(|&t| t == Token::Br);
        match bl {
            Some(i) if bl > br => {
                tokens.remove(i);
            }
            _ => break,
        }
    }
}

/// Index where the last event of the last voice begins.
///
/// The event is found through its last pitch letter, walking back over the
/// chord's other pitches and its prefix tags (stem, grace, tremolo). A voice
/// with no pitch letter yields the voice start. A trailing `VB`/`EOM` is not
/// part of the voice.
pub fn last_event_start(tokens: &[Token]) -> usize {
    let body = match tokens.last() {
        Some(Token::Vb | Token::Eom) => &tokens[..tokens.len() - 1],
        _ => tokens,
    };
    let voice_start = match body.iter().rposition(|&t| t == Token::Vb) {
        Some(i) => i + 1,
        None => usize::from(body.first() == Some(&Token::Bom)),
    };

    let Some(last_pitch) = body[voice_start..]
        .iter()
        .rposition(|t| t.is_token_of(TokenGroup::Phonet))
        .map(|i| voice_start + i)
    else {
        return voice_start;
    };

    let mut start = last_pitch;
    while start > voice_start && is_event_head(body[start - 1]) {
        start -= 1;
    }
    start
}

fn is_event_head(token: Token) -> bool {
    matches!(
        token.group(),
        TokenGroup::Phonet
            | TokenGroup::Accidental
            | TokenGroup::OctaveMark
            | TokenGroup::Stem
            | TokenGroup::Grace
            | TokenGroup::Tremolo
            | TokenGroup::TremoloCast
    )
}

/// Index of the greatest finite logit; the first one wins ties.
pub fn argmax(logits: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &l) in logits.iter().enumerate() {
        if l.is_finite() && best.is_none_or(|(_, b)| l > b) {
            best = Some((i, l));
        }
    }
    best.map(|(i, _)| i)
}
