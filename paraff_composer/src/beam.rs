// Beam search over measure continuations.
//
// Each step expands the `branch_n` best branches in parallel (one predictor
// call each), scores every admissible next token by its log-softmax plus a
// constant step award, and ranks all children together. Where guided sampling
// would repair a bad state, beam search simply rejects the branch: overflow,
// a beam still open in a full voice, a tail chord outside the pitch window,
// a notehead collision, a broken timewarp at a voice boundary, runaway
// nesting.
//
// The best complete (`EOM`, valid timewarp) branch seen so far is kept as the
// candidate, and nothing scoring below it is ever returned in its place.
// Search stops when the top branch completes, the frontier empties, the step
// quota runs out, or the best open branch already scores below the
// candidate. The last rule compares branches of different lengths
// and is a pruning heuristic, not an admissible bound.

use crate::error::ComposeError;
use crate::guide::{
    MAX_EVENT_STACK, forbidden_mask, initial_guide_mask, mask_from_status, prompt_descriptors,
};
use crate::options::DecisiveOptions;
use crate::predictor::{PredictorCursor, TokenPredictor};
use crate::transitions::TransitionTable;
use crate::validator::{MeasureValidator, timewarp_invalid, validate};
use paraff_notation::collision::{CollisionOptions, check_notehead_conflict};
use paraff_notation::{Token, TokenGroup, TokenMask};
use rayon::prelude::*;
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub struct ComposerBranch {
    /// Cumulative log-probability plus step awards.
    pub logit: f64,
    pub tokens: Vec<Token>,
    pub last_token: Token,
    pub guide_mask: TokenMask,
    pub event_stack: u32,
}

impl ComposerBranch {
    fn is_complete(&self) -> bool {
        self.last_token == Token::Eom
    }
}

/// Read-only state shared by every branch expansion of one search.
struct Search<'a, V: ?Sized> {
    validator: &'a V,
    grammar: &'a TransitionTable,
    options: &'a DecisiveOptions,
    descriptors: Vec<u32>,
    initial_mask: TokenMask,
    forbidden: TokenMask,
}

impl<V: MeasureValidator + ?Sized> Search<'_, V> {
    /// Children of `branch`, one per token with a finite score. An empty
    /// result rejects the branch.
    fn expand<P: TokenPredictor>(
        &self,
        branch: &ComposerBranch,
        predictor: &P,
    ) -> Result<Vec<ComposerBranch>, ComposeError> {
        let options = self.options;
        let row = *self.grammar.row(branch.last_token);
        let tokens = &branch.tokens;
        let mut guide = branch.guide_mask;
        let mut event_stack = branch.event_stack;

        if branch.last_token == Token::Vb {
            if timewarp_invalid(self.validator, tokens)? {
                return Ok(Vec::new());
            }
            guide = self.initial_mask;
        } else if row.contains(Token::Eom) {
            event_stack = 0;

            let measure = validate(self.validator, tokens, Some(Token::Eom))?;
            let status = &measure.tail_status;
            if status.overflowing() {
                return Ok(Vec::new());
            }
            guide = mask_from_status(status);

            if options.limit_pitch
                && status.chord.as_ref().is_some_and(|chord| {
                    chord.iter().any(|p| !options.pitch_window.contains(p.note))
                })
            {
                return Ok(Vec::new());
            }

            if options.forbid_notehead_conflict
                && check_notehead_conflict(&measure, CollisionOptions::default())
            {
                return Ok(Vec::new());
            }

            if status.beam_open {
                if status.full() {
                    return Ok(Vec::new());
                }
                guide.forbid(Token::Vb);
                guide.forbid(Token::Eom);
            }

            if options.forbid_partial && status.partial() && !tokens.contains(&Token::Vb) {
                guide.forbid(Token::Vb);
                guide.forbid(Token::Eom);
            }
        } else {
            event_stack += 1;
            if event_stack > MAX_EVENT_STACK {
                return Ok(Vec::new());
            }

            if options.limit_pitch
                && tokens.len() >= 4
                && tokens[tokens.len() - 4..]
                    .iter()
                    .all(|t| t.is_token_of(TokenGroup::OctaveMark))
            {
                return Ok(Vec::new());
            }
        }

        let admissible = TokenMask::all_of([&row, &guide, &self.forbidden]);
        let logits = predictor
            .deduce(&self.descriptors, tokens)
            .map_err(ComposeError::Predictor)?;

        let masked: Vec<(Token, f64)> = admissible
            .iter()
            .filter_map(|t| {
                let l = *logits.get(t.id() as usize)?;
                l.is_finite().then_some((t, l))
            })
            .collect();
        let Some(base) = log_sum_exp(masked.iter().map(|&(_, l)| l)) else {
            return Ok(Vec::new());
        };

        Ok(masked
            .into_iter()
            .map(|(t, l)| {
                let mut next = tokens.clone();
                next.push(t);
                ComposerBranch {
                    logit: branch.logit + (l - base) + options.step_award,
                    tokens: next,
                    last_token: t,
                    guide_mask: guide,
                    event_stack,
                }
            })
            .collect())
    }
}

/// ln(sum(exp(x))) over finite inputs; `None` when there are none.
fn log_sum_exp(values: impl Iterator<Item = f64> + Clone) -> Option<f64> {
    let max = values.clone().fold(f64::NEG_INFINITY, f64::max);
    if !max.is_finite() {
        return None;
    }
    let sum: f64 = values.map(|v| (v - max).exp()).sum();
    Some(max + sum.ln())
}

/// Beam search for one measure. Always returns a branch: the best complete
/// one found, or failing that the best open one (or the primer) when the
/// search runs out.
pub fn compose_decisive<P, V>(
    predictors: &[P],
    validator: &V,
    grammar: &TransitionTable,
    options: &DecisiveOptions,
) -> Result<ComposerBranch, ComposeError>
where
    P: TokenPredictor,
    V: MeasureValidator + ?Sized,
{
    let mut primer = options.primer.clone();
    if primer.is_empty() {
        primer.push(Token::Bom);
    }

    let search = Search {
        validator,
        grammar,
        options,
        descriptors: prompt_descriptors(&options.prompt, &options.vocab),
        initial_mask: initial_guide_mask(options.staff_limit),
        forbidden: forbidden_mask(&options.forbidden_tokens),
    };
    let mut cursor = PredictorCursor::new(predictors, search.descriptors.len() + primer.len())?;

    let root = ComposerBranch {
        logit: 0.0,
        last_token: *primer.last().unwrap_or(&Token::Bom),
        tokens: primer,
        guide_mask: search.initial_mask,
        event_stack: 0,
    };
    let mut candidate = root.clone();
    let mut branches = vec![root];
    let branch_n = options.branch_n.max(1);
    let mut steps = 0;

    while let Some(predictor) = cursor.current() {
        let width = branch_n.min(branches.len());
        let mut expanded = branches[..width]
            .par_iter()
            .map(|b| search.expand(b, predictor))
            .collect::<Result<Vec<_>, _>>()?;

        // Top up from lower-ranked branches when rejections leave the beam
        // short.
        while expanded.iter().filter(|c| !c.is_empty()).count() < branch_n
            && expanded.len() < branches.len()
        {
            expanded.push(search.expand(&branches[expanded.len()], predictor)?);
        }

        branches = expanded.into_iter().flatten().collect();
        branches.sort_by(|a, b| b.logit.total_cmp(&a.logit));

        let Some(best) = branches.first() else {
            debug!(steps, "beam frontier empty");
            break;
        };
        let top_len = best.tokens.len();

        let mut skip = 0;
        if best.is_complete() {
            if !timewarp_invalid(validator, &best.tokens)? {
                if candidate.is_complete() && candidate.logit > best.logit {
                    debug!(steps, candidate = candidate.logit, "earlier completion wins");
                    return Ok(candidate);
                }
                debug!(steps, logit = best.logit, "beam search complete");
                return Ok(branches.swap_remove(0));
            }
            skip = 1;
        }

        for done in branches[skip..]
            .iter()
            .filter(|b| b.is_complete() && b.logit.is_finite())
        {
            if candidate.is_complete() && done.logit <= candidate.logit {
                break;
            }
            if !timewarp_invalid(validator, &done.tokens)? {
                candidate = done.clone();
                break;
            }
        }

        steps += 1;
        if steps > options.step_quota {
            debug!(steps, "beam step quota exceeded");
            if !candidate.is_complete() && skip < branches.len() {
                candidate = branches.swap_remove(skip);
            }
            break;
        }

        branches.retain(|b| b.logit.is_finite() && !b.is_complete());
        let Some(best) = branches.first() else {
            debug!(steps, "beam frontier exhausted");
            break;
        };

        if candidate.is_complete() && best.logit < candidate.logit {
            debug!(steps, candidate = candidate.logit, "beam early exit");
            break;
        }

        cursor.fit(search.descriptors.len() + top_len);
    }

    Ok(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_sum_exp() {
        let v = [0.0_f64, 0.0];
        let lse = log_sum_exp(v.iter().copied()).unwrap();
        assert!((lse - 2.0_f64.ln()).abs() < 1e-12);

        // Large logits stay finite.
        let v = [1000.0_f64, 1000.0];
        let lse = log_sum_exp(v.iter().copied()).unwrap();
        assert!((lse - (1000.0 + 2.0_f64.ln())).abs() < 1e-9);

        assert!(log_sum_exp(std::iter::empty::<f64>()).is_none());
    }
}
