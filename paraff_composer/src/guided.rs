// Guided sampling: one path, one token at a time.
//
// Each step intersects five masks (grammar row, guide, per-voice exclusions,
// caller's forbidden list, disposable masker), asks the active predictor for
// logits, and samples one admissible token. Wherever `EOM` is grammatical
// the validator is consulted first:
//
// - overflow (`filling > 0`): the last token is popped and excluded for the
//   rest of the voice, and the step is retried
// - otherwise the guide mask is rebuilt from the tail status
//
// At every voice boundary orphan beam openings are dropped and the timewarp
// is checked; a broken timewarp backtracks to the start of the voice's last
// event instead of ending the voice.
//
// Every exit except a structurally impossible state (no finite logit, or PAD
// sampled) closes the measure: truncate to the last point that admits `EOM`,
// drop orphan beam openings, append `EOM`.

use crate::error::ComposeError;
use crate::guide::{
    MAX_EVENT_STACK, argmax, forbidden_mask, initial_guide_mask, last_event_start,
    mask_from_status, prompt_descriptors, tidy_beam,
};
use crate::masker::DisposableMasker;
use crate::options::ComposeOptions;
use crate::predictor::{PredictorCursor, TokenPredictor};
use crate::transitions::TransitionTable;
use crate::validator::{MeasureValidator, probe_tail, timewarp_invalid};
use paraff_notation::sequence::stringify_tokens;
use paraff_notation::{TailStatus, Token, TokenGroup, TokenMask};
use paraff_prng::DecodeRng;
use tracing::{debug, warn};

/// Sample one measure. The result ends in `EOM` unless decoding hit a
/// structurally impossible masking state.
pub fn compose<P, V>(
    predictors: &[P],
    validator: &V,
    grammar: &TransitionTable,
    options: &ComposeOptions,
    mut masker: Option<&mut DisposableMasker>,
    rng: &mut DecodeRng,
) -> Result<Vec<Token>, ComposeError>
where
    P: TokenPredictor,
    V: MeasureValidator + ?Sized,
{
    let descriptors = prompt_descriptors(&options.prompt, &options.vocab);
    let mut tokens = options.primer.clone();
    if tokens.is_empty() {
        tokens.push(Token::Bom);
    }
    let mut cursor = PredictorCursor::new(predictors, descriptors.len() + tokens.len())?;

    let initial_mask = initial_guide_mask(options.staff_limit);
    let forbidden = forbidden_mask(&options.forbidden_tokens);
    let mut guide = initial_mask;
    let mut voice_guide = TokenMask::full();

    let mut event_stack = 0;
    let mut steps = 0;
    let mut last_status: Option<TailStatus> = None;

    loop {
        let Some(predictor) = cursor.current() else {
            debug!("predictors exhausted");
            close_out(&mut tokens, grammar, last_status.as_ref());
            break;
        };
        let Some(&last) = tokens.last() else {
            close_out(&mut tokens, grammar, last_status.as_ref());
            break;
        };
        let row = *grammar.row(last);

        if options.parser_guide {
            if row.contains(Token::Eom) {
                event_stack = 0;

                let status = probe_tail(validator, &tokens)?;
                if status.overflowing() {
                    debug!(token = %last, "overflow, popping");
                    tokens.pop();
                    voice_guide.forbid(last);
                    if let Some(m) = masker.as_deref_mut() {
                        m.rewind(&tokens);
                    }
                    last_status = Some(status);
                    continue;
                }

                guide = mask_from_status(&status);
                if status.beam_open {
                    guide.forbid(Token::Vb);
                    voice_guide.allow(Token::Br);
                }
                if options.forbid_partial && status.partial() && !tokens.contains(&Token::Vb) {
                    guide.forbid(Token::Vb);
                    guide.forbid(Token::Eom);
                }
                last_status = Some(status);
            } else {
                event_stack += 1;
                if event_stack > MAX_EVENT_STACK {
                    debug!(sequence = %stringify_tokens(&tokens), "event stack explosion");
                    close_out(&mut tokens, grammar, last_status.as_ref());
                    break;
                }

                // Inside an unfinished timewarp, a duration may only be written
                // where the grammar would not let the timewarp continue.
                if last_status.as_ref().is_some_and(|s| s.incomplete_time_warping)
                    && row.contains(Token::D1)
                {
                    let allow = !row.contains(Token::W);
                    for t in TokenGroup::Division.tokens() {
                        guide.set(t, allow);
                    }
                }
            }
        }

        let full = TokenMask::full();
        let masker_mask = masker.as_deref().map_or(&full, DisposableMasker::mask);
        let admissible = TokenMask::all_of([&row, &guide, &voice_guide, &forbidden, masker_mask]);
        if admissible.is_empty() {
            debug!(token = %last, "no admissible token");
            close_out(&mut tokens, grammar, last_status.as_ref());
            break;
        }

        let logits = predictor
            .deduce(&descriptors, &tokens)
            .map_err(ComposeError::Predictor)?;
        let masked = mask_logits(&logits, &admissible, options.temperature);

        steps += 1;
        if steps > options.step_quota {
            debug!(steps, "step quota exceeded");
            close_out(&mut tokens, grammar, last_status.as_ref());
            break;
        }

        let choice = if options.temperature > 0.0 {
            rng.choose_logits(&masked)
        } else {
            argmax(&masked)
        };
        let Some(next) = choice.and_then(|i| Token::from_id(i as u32)) else {
            warn!(token = %last, "no finite logit, stopping");
            break;
        };
        if next == Token::Pad {
            warn!(token = %last, "sampled PAD, stopping");
            break;
        }

        tokens.push(next);
        if let Some(m) = masker.as_deref_mut() {
            m.next_token(next);
        }
        cursor.fit(descriptors.len() + tokens.len());

        if matches!(next, Token::Vb | Token::Eom) {
            tidy_beam(&mut tokens, last_status.as_ref());

            if timewarp_invalid(validator, &tokens)? {
                let start = last_event_start(&tokens);
                debug!(popped = tokens.len() - start, "invalid timewarp, backtracking");
                tokens.truncate(start);
                if let Some(m) = masker.as_deref_mut() {
                    m.rewind(&tokens);
                }
                guide = initial_mask;
                voice_guide = TokenMask::full();
                continue;
            }
        }

        match next {
            Token::Eom => break,
            Token::Vb => {
                guide = initial_mask;
                voice_guide = TokenMask::full();
            }
            _ => {}
        }
    }

    if let Some(m) = masker {
        m.rewind(&tokens);
    }
    Ok(tokens)
}

/// Inadmissible entries become -inf; admissible ones are divided by the
/// temperature when it is positive.
fn mask_logits(logits: &[f64], admissible: &TokenMask, temperature: f64) -> Vec<f64> {
    let scale = if temperature > 0.0 { temperature } else { 1.0 };
    Token::ALL
        .iter()
        .map(|&t| match logits.get(t.id() as usize) {
            Some(&l) if admissible.contains(t) => l / scale,
            _ => f64::NEG_INFINITY,
        })
        .collect()
}

/// Truncate to the last token that admits `EOM`, drop orphan beam openings,
/// and append `EOM`.
pub fn close_out(tokens: &mut Vec<Token>, grammar: &TransitionTable, last_status: Option<&TailStatus>) {
    while let Some(&t) = tokens.last() {
        if grammar.allows(t, Token::Eom) {
            break;
        }
        tokens.pop();
    }
    tidy_beam(tokens, last_status);
    tokens.push(Token::Eom);
}

#[cfg(test)]
mod tests {
    use super::*;
    use paraff_notation::sequence::parse_code_tokens;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_mask_logits() {
        let mut logits = vec![1.0; Token::ALL.len()];
        logits[Token::C.id() as usize] = 4.0;
        let admissible = TokenMask::from_tokens([Token::C, Token::D]);
        let masked = mask_logits(&logits, &admissible, 2.0);
        assert_eq!(masked[Token::C.id() as usize], 2.0);
        assert_eq!(masked[Token::D.id() as usize], 0.5);
        assert_eq!(masked[Token::E.id() as usize], f64::NEG_INFINITY);

        // Short logit vectors leave the missing tail inadmissible.
        let masked = mask_logits(&[0.0; 3], &TokenMask::full(), 1.0);
        assert_eq!(masked[Token::C.id() as usize], f64::NEG_INFINITY);
        assert_eq!(masked[0], 0.0);
    }

    #[test]
    fn test_close_out() {
        let grammar = TransitionTable::from_sentences([
            parse_code_tokens("BOM c D8 Bl c D8 EOM").as_slice(),
        ]);
        let open = TailStatus {
            beam_open: true,
            ..Default::default()
        };

        let mut tokens = parse_code_tokens("BOM c D8 Bl c");
        close_out(&mut tokens, &grammar, Some(&open));
        assert_eq!(tokens, parse_code_tokens("BOM c D8 EOM"));

        let mut tokens = parse_code_tokens("BOM c D8 Bl c D8");
        close_out(&mut tokens, &grammar, None);
        assert_eq!(tokens, parse_code_tokens("BOM c D8 Bl c D8 EOM"));
    }
}
