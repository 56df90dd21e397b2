// Measure tool: inspect and normalize validator output.
//
// Reads a JSON array of measures (as the grammar validator emits them) and,
// for each, prints the serialized token text and whether two voices put
// noteheads on the same spot. With --fix-ties, tie/slur normalization runs
// first and the number of changes is reported. With --combine-spaces, runs of
// invisible rests in the token text are merged.
//
// Usage:
//   cargo run -p paraff_notation --features cli --bin measure_tool -- <measures.json>
//     [--fix-ties] [--check-rest] [--combine-spaces]
//
// Set RUST_LOG=debug for library diagnostics on stderr.

use paraff_notation::collision::{CollisionOptions, check_notehead_conflict};
use paraff_notation::sequence::{combine_spaces, stringify_tokens};
use paraff_notation::serialize::serialize_measure;
use paraff_notation::ties::fix_ties;
use paraff_notation::{Measure, NotationError};
use std::path::Path;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    let Some(input) = args.get(1).filter(|s| !s.starts_with("--")) else {
        eprintln!(
            "usage: measure_tool <measures.json> [--fix-ties] [--check-rest] [--combine-spaces]"
        );
        std::process::exit(2);
    };
    let fix = has_flag(&args, "--fix-ties");
    let combine = has_flag(&args, "--combine-spaces");
    let options = CollisionOptions {
        check_rest: has_flag(&args, "--check-rest"),
    };

    let mut measures = match load_measures(Path::new(input)) {
        Ok(m) => m,
        Err(e) => {
            eprintln!("Failed to load {}: {}", input, e);
            std::process::exit(1);
        }
    };

    for (i, measure) in measures.iter_mut().enumerate() {
        println!("=== Measure {} ===", i + 1);
        if fix {
            let n = fix_ties(measure);
            println!("  Tie fixes: {}", n);
        }
        let mut tokens = serialize_measure(measure);
        if combine {
            tokens = combine_spaces(&tokens);
        }
        println!("{}", stringify_tokens(&tokens));
        println!(
            "  Notehead collision: {}",
            check_notehead_conflict(measure, options)
        );
    }
}

fn load_measures(path: &Path) -> Result<Vec<Measure>, NotationError> {
    let text = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|a| a == flag)
}
