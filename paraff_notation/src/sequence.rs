// Helpers over raw token sequences and finished measures.
//
// Token text is the space-separated wire form the grammar validator parses;
// `stringify_tokens` additionally breaks the line after every `VB` so a
// multi-voice measure reads one voice per line. The voice helpers treat a
// sequence as `BOM voice (VB voice)* EOM`, tolerating a missing terminator.

use crate::document::Measure;
use crate::vocab::{DIVISION, PromptToken, Token, TokenGroup};
use tracing::debug;

pub fn stringify_tokens(tokens: &[Token]) -> String {
    let mut out = String::new();
    for (i, t) in tokens.iter().enumerate() {
        if i > 0 {
            out.push(if tokens[i - 1] == Token::Vb { '\n' } else { ' ' });
        }
        out.push_str(t.name());
    }
    out
}

/// Whitespace-separated token names; unknown words are dropped.
pub fn parse_code_tokens(code: &str) -> Vec<Token> {
    code.split_whitespace().filter_map(Token::from_name).collect()
}

/// Split a measure sequence into per-voice token runs. A leading `BOM` and
/// the final token (normally `EOM`) are dropped, as are empty voices.
pub fn split_voices(tokens: &[Token]) -> Vec<Vec<Token>> {
    let body = match tokens {
        [Token::Bom, rest @ ..] => rest,
        _ => tokens,
    };
    let body = match body.split_last() {
        Some((_, init)) => init,
        None => body,
    };

    body.split(|&t| t == Token::Vb)
        .filter(|v| !v.is_empty())
        .map(<[Token]>::to_vec)
        .collect()
}

/// Terminate every voice with `VB`, the last one with `EOM`.
pub fn join_voices(voices: &[Vec<Token>]) -> Vec<Token> {
    let mut out = Vec::new();
    for (i, voice) in voices.iter().enumerate() {
        out.extend_from_slice(voice);
        out.push(if i + 1 == voices.len() {
            Token::Eom
        } else {
            Token::Vb
        });
    }
    out
}

/// Remove the incomplete last voice of an unterminated sequence and close
/// what remains with `EOM`. Terminated sequences are returned unchanged.
pub fn ampute(tokens: &[Token]) -> Vec<Token> {
    if tokens.last() == Some(&Token::Eom) {
        return tokens.to_vec();
    }

    let mut voices = split_voices(tokens);
    voices.pop();
    if voices.is_empty() {
        return Vec::new();
    }

    let mut out = Vec::new();
    if tokens.first() == Some(&Token::Bom) {
        out.push(Token::Bom);
    }
    out.extend(join_voices(&voices));
    out
}

/// Duration of the longest voice, with a whole note worth `whole` ticks.
pub fn tick_duration(measure: &Measure, whole: f64) -> f64 {
    measure
        .voices
        .iter()
        .map(|v| whole * v.events_time.value())
        .fold(0.0, f64::max)
}

/// Invisible-rest padding per voice that brings every voice up to the
/// longest one. Residuals whose denominator has no division token are left
/// unpadded.
pub fn tidy_padding(measure: &Measure) -> Vec<Vec<Token>> {
    if measure.voices.len() < 2 {
        return vec![Vec::new()];
    }

    let max = measure
        .voices
        .iter()
        .map(|v| v.events_time)
        .reduce(|max, t| if t.value() > max.value() { t } else { max })
        .unwrap_or_default();

    measure
        .voices
        .iter()
        .map(|voice| {
            let residual = max - voice.events_time;
            if residual.numerator <= 0 {
                return Vec::new();
            }

            let d = residual.denominator;
            let division = (d > 0 && d.count_ones() == 1)
                .then(|| DIVISION.token(d.trailing_zeros() as i32))
                .flatten();
            let Some(division) = division else {
                debug!(%residual, "no division token for padding residual");
                return Vec::new();
            };

            [Token::A, division, Token::RSpace]
                .repeat(residual.numerator as usize)
        })
        .collect()
}

/// Merge runs of two or more invisible rests of one division
/// (`x Dn RSpace x Dn RSpace ...`) into a single longer rest, dotted for runs
/// of three or seven, followed by whatever the merged value does not cover.
/// Longer divisions merge first; merging repeats until no run is left.
pub fn combine_spaces(tokens: &[Token]) -> Vec<Token> {
    let mut tokens = tokens.to_vec();

    while let Some(run) = longest_space_run(&tokens) {
        let shift = run.exp.min(run.n.ilog2());
        let dots: u32 = match run.n {
            3 => 1,
            7 => 2,
            _ => 0,
        };
        let dots = dots.min(shift);
        let covered = (1 << (shift + 1)) - (1 << (shift - dots));
        let residue = run.n - covered;

        let Some(merged) = DIVISION.token((run.exp - shift) as i32) else {
            break;
        };
        let mut replacement = vec![run.phonet, merged];
        replacement.extend(std::iter::repeat_n(Token::Dot, dots as usize));
        replacement.push(Token::RSpace);
        for _ in 0..residue {
            replacement.extend([run.phonet, run.division, Token::RSpace]);
        }

        let end = run.start + 3 * run.n as usize;
        tokens = [&tokens[..run.start], &replacement[..], &tokens[end..]].concat();
    }

    tokens
}

struct SpaceRun {
    start: usize,
    n: u32,
    phonet: Token,
    division: Token,
    /// Division exponent (`D8` is 3).
    exp: u32,
}

fn space_at(tokens: &[Token], i: usize) -> Option<(Token, Token)> {
    match tokens.get(i..i + 3)? {
        &[p, d, Token::RSpace] if p.is_token_of(TokenGroup::Phonet) => Some((p, d)),
        _ => None,
    }
}

/// The leftmost run of the longest division that has at least two spaces.
fn longest_space_run(tokens: &[Token]) -> Option<SpaceRun> {
    let mut best: Option<SpaceRun> = None;
    let mut i = 0;
    while i < tokens.len() {
        let Some((phonet, division)) = space_at(tokens, i) else {
            i += 1;
            continue;
        };
        let exp = match DIVISION.value(division) {
            Some(e) if e > 0 => e as u32,
            _ => {
                i += 3;
                continue;
            }
        };

        let mut n = 1;
        while space_at(tokens, i + 3 * n as usize).is_some_and(|(_, d)| d == division) {
            n += 1;
        }
        if n >= 2 && best.as_ref().is_none_or(|b| exp < b.exp) {
            best = Some(SpaceRun {
                start: i,
                n,
                phonet,
                division,
                exp,
            });
        }
        i += 3 * n as usize;
    }
    best
}

/// Aggregate per-measure descriptors into score-level descriptors: the
/// widest staff layout, poly- or mono-voice, and `#complicated` when more
/// than a fifth of the measures are.
pub fn describe_score(measures: &[Vec<PromptToken>]) -> Vec<PromptToken> {
    let any = |p: PromptToken| measures.iter().any(|ds| ds.contains(&p));

    let mut descs = Vec::new();
    descs.push(if any(PromptToken::TripleStaff) {
        PromptToken::TripleStaff
    } else if any(PromptToken::DoubleStaff) {
        PromptToken::DoubleStaff
    } else {
        PromptToken::SingleStaff
    });

    descs.push(if any(PromptToken::PolyVoice) {
        PromptToken::PolyVoice
    } else {
        PromptToken::MonoVoice
    });

    let complicated = measures
        .iter()
        .filter(|ds| ds.contains(&PromptToken::Complicated))
        .count();
    if !measures.is_empty() && complicated as f64 / measures.len() as f64 > 0.2 {
        descs.push(PromptToken::Complicated);
    }

    descs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Voice;
    use crate::fraction::Fraction;
    use pretty_assertions::assert_eq;

    fn toks(code: &str) -> Vec<Token> {
        parse_code_tokens(code)
    }

    #[test]
    fn test_stringify_breaks_after_vb() {
        let s = stringify_tokens(&toks("BOM c D4 VB e D4 EOM"));
        assert_eq!(s, "BOM c D4 VB\ne D4 EOM");
    }

    #[test]
    fn test_parse_drops_unknown_words() {
        assert_eq!(
            parse_code_tokens("BOM  c\tD4 zzz\nEOM"),
            vec![Token::Bom, Token::C, Token::D4, Token::Eom]
        );
    }

    #[test]
    fn test_split_and_join() {
        let seq = toks("BOM c D4 VB e D4 VB g D2 EOM");
        let voices = split_voices(&seq);
        assert_eq!(
            voices,
            vec![toks("c D4"), toks("e D4"), toks("g D2")]
        );
        let mut joined = vec![Token::Bom];
        joined.extend(join_voices(&voices));
        assert_eq!(joined, seq);
    }

    #[test]
    fn test_ampute() {
        let done = toks("BOM c D4 EOM");
        assert_eq!(ampute(&done), done);
        assert_eq!(
            ampute(&toks("BOM c D4 VB e D4 VB g D2")),
            toks("BOM c D4 VB e D4 EOM")
        );
        assert!(ampute(&toks("BOM c D4")).is_empty());
    }

    fn measure_with_times(times: &[Fraction]) -> Measure {
        Measure {
            voices: times
                .iter()
                .map(|&t| Voice {
                    events_time: t,
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_tick_duration() {
        let m = measure_with_times(&[Fraction::new(1, 2), Fraction::new(3, 4)]);
        assert_eq!(tick_duration(&m, 1920.0), 1440.0);
        assert_eq!(tick_duration(&Measure::default(), 1920.0), 0.0);
    }

    #[test]
    fn test_tidy_padding() {
        let m = measure_with_times(&[Fraction::new(3, 4), Fraction::new(1, 4)]);
        assert_eq!(
            tidy_padding(&m),
            vec![
                vec![],
                toks("a D2 RSpace"),
            ]
        );

        let m = measure_with_times(&[Fraction::new(1, 8), Fraction::new(1, 2)]);
        assert_eq!(tidy_padding(&m)[0], toks("a D8 RSpace a D8 RSpace a D8 RSpace"));

        let single = measure_with_times(&[Fraction::new(1, 2)]);
        assert_eq!(tidy_padding(&single), vec![Vec::<Token>::new()]);

        // A triplet residual has no plain division token.
        let m = measure_with_times(&[Fraction::new(1, 3), Fraction::new(1, 2)]);
        assert!(tidy_padding(&m)[0].is_empty());
    }

    #[test]
    fn test_describe_score() {
        let dss = vec![
            vec![PromptToken::DoubleStaff, PromptToken::MonoVoice],
            vec![PromptToken::SingleStaff, PromptToken::PolyVoice, PromptToken::Complicated],
            vec![PromptToken::SingleStaff],
        ];
        assert_eq!(
            describe_score(&dss),
            vec![PromptToken::DoubleStaff, PromptToken::PolyVoice, PromptToken::Complicated]
        );
        assert_eq!(
            describe_score(&[]),
            vec![PromptToken::SingleStaff, PromptToken::MonoVoice]
        );
    }

    #[test]
    fn test_combine_space_pairs() {
        assert_eq!(
            combine_spaces(&toks("BOM c D4 c D8 RSpace c D8 RSpace EOM")),
            toks("BOM c D4 c D4 RSpace EOM")
        );
        // Two halves make a whole.
        assert_eq!(combine_spaces(&toks("a D2 RSpace a D2 RSpace")), toks("a D1 RSpace"));
    }

    #[test]
    fn test_combine_dotted_runs() {
        assert_eq!(
            combine_spaces(&toks("e D16 RSpace e D16 RSpace e D16 RSpace")),
            toks("e D8 Dot RSpace")
        );
        let seven = "c D16 RSpace ".repeat(7);
        assert_eq!(combine_spaces(&toks(&seven)), toks("c D4 Dot Dot RSpace"));
    }

    #[test]
    fn test_combine_leaves_residue() {
        let five = "c D8 RSpace ".repeat(5);
        assert_eq!(combine_spaces(&toks(&five)), toks("c D2 RSpace c D8 RSpace"));

        // Six eighths: a half, then the leftover pair merges into a quarter.
        let six = "c D8 RSpace ".repeat(6);
        assert_eq!(combine_spaces(&toks(&six)), toks("c D2 RSpace c D4 RSpace"));
    }

    #[test]
    fn test_combine_ignores_lone_and_mixed_spaces() {
        let seq = toks("BOM c D8 RSpace d D4 RSpace e D8 c D8 RSpace EOM");
        assert_eq!(combine_spaces(&seq), seq);
    }

    #[test]
    fn test_combine_padding() {
        let m = measure_with_times(&[Fraction::new(1, 8), Fraction::new(1, 2)]);
        assert_eq!(combine_spaces(&tidy_padding(&m)[0]), toks("a D4 Dot RSpace"));
    }
}
