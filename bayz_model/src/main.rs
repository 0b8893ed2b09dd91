// CLI entry point for bayz sequence generation.
//
// Two subcommands:
//
//   bayz-generate fit --embedding <VECTORS> --corpus <CORPUS> --out <MODEL>
//     [--config <CONFIG>] [--components N] [--seed N]
//
//   bayz-generate generate --embedding <VECTORS> --model <MODEL>
//     [--corpus <CORPUS>] [--config <CONFIG>] [--count N] [--seed N]
//     [--pitches] [--octave N] [--melody]
//
// `fit` fits the mixture and n-gram table and writes the model file.
// `generate` loads it and prints one line per generated sequence, words
// separated by spaces. With `--corpus`, type ids follow a Markov chain
// fitted on the labelled corpus; otherwise they are drawn by mixture
// weight. `--pitches` prints MIDI numbers instead of words.
//
// Set RUST_LOG (e.g. `RUST_LOG=debug`) for more detail.

use std::path::PathBuf;
use std::sync::Arc;

use bayz_model::pitch::{DEFAULT_OCTAVE, PitchSelection, sequence_pitches};
use bayz_model::{
    BayzConfig, BoxedTypeSource, GenerationCache, GenerationConfig, KeyedVectors,
    MarkovTypeSource, MixtureTypeSource, ModelError, Sequencer, TypeModel, boxed, load_corpus,
};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    let result = match args.get(1).map(String::as_str) {
        Some("fit") => run_fit(&args[2..]),
        Some("generate") => run_generate(&args[2..]),
        Some("--help") | Some("-h") => {
            print_usage();
            return;
        }
        Some(other) => {
            eprintln!("Unknown command: {other}");
            print_usage();
            std::process::exit(1);
        }
        None => {
            print_usage();
            std::process::exit(1);
        }
    };

    if let Err(e) = result {
        eprintln!("bayz-generate: {e}");
        std::process::exit(1);
    }
}

fn run_fit(args: &[String]) -> Result<(), ModelError> {
    let mut config = load_config(args)?;
    if let Some(n) = parse_flag(args, "--components") {
        config.model.n_components = n;
    }
    if let Some(seed) = parse_flag(args, "--seed") {
        config.model.fit_seed = seed;
    }
    let embedding = KeyedVectors::load(&required_path(args, "--embedding"))?;
    let corpus = load_corpus(&required_path(args, "--corpus"))?;
    let out = required_path(args, "--out");

    let mut model = TypeModel::new(embedding, config.model)?;
    model.fit(&corpus)?;
    model.save(&out)?;
    println!(
        "Fitted {} components over {} tokens -> {}",
        model.component_count(),
        model.embedding().len(),
        out.display()
    );
    Ok(())
}

fn run_generate(args: &[String]) -> Result<(), ModelError> {
    let mut config = load_config(args)?;
    if let Some(seed) = parse_flag(args, "--seed") {
        config.generation.seed = Some(seed);
    }
    let count: usize = parse_flag(args, "--count").unwrap_or(1);
    let octave: i32 = parse_flag(args, "--octave").unwrap_or(DEFAULT_OCTAVE);
    let selection = if args.iter().any(|a| a == "--melody") {
        PitchSelection::Last
    } else {
        PitchSelection::All
    };
    let pitches = args.iter().any(|a| a == "--pitches");

    let embedding = KeyedVectors::load(&required_path(args, "--embedding"))?;
    let mut model = TypeModel::new(embedding, config.model.clone())?;
    model.load(&required_path(args, "--model"))?;
    let corpus = parse_flag::<PathBuf>(args, "--corpus")
        .map(|path| load_corpus(&path))
        .transpose()?;
    let source = type_source(&model, corpus.as_deref(), &config)?;

    let sequencer = Sequencer::new(Arc::new(model), config.generation.delimiter.clone());
    let generation = GenerationConfig {
        pre_gen: 0,
        ..config.generation.clone()
    };
    let mut cache = GenerationCache::from_config(sequencer, source, &generation)?;
    for _ in 0..count {
        let sequence = cache.next()?;
        if pitches {
            let line: Vec<String> = sequence_pitches(&sequence, octave, selection)
                .iter()
                .map(i32::to_string)
                .collect();
            println!("{}", line.join(" "));
        } else {
            let words: Vec<String> = sequence
                .iter()
                .map(|token| token.join(config.generation.delimiter.as_str()))
                .collect();
            println!("{}", words.join(" "));
        }
    }
    Ok(())
}

/// Markov chain over labelled corpus ids when a corpus is given, else
/// independent draws by mixture weight.
fn type_source(
    model: &TypeModel<KeyedVectors>,
    corpus: Option<&[Vec<String>]>,
    config: &BayzConfig,
) -> Result<BoxedTypeSource, ModelError> {
    let lengths = config.generation.min_length..=config.generation.max_length;
    match corpus {
        Some(corpus) => {
            let labelled = model.label_sequences(corpus)?;
            Ok(boxed(MarkovTypeSource::fit(&labelled, model.component_count(), lengths)?))
        }
        None => Ok(boxed(MixtureTypeSource::new(model.mixture(), lengths)?)),
    }
}

fn load_config(args: &[String]) -> Result<BayzConfig, ModelError> {
    match parse_flag::<PathBuf>(args, "--config") {
        Some(path) => BayzConfig::load(&path),
        None => Ok(BayzConfig::default()),
    }
}

fn required_path(args: &[String], flag: &str) -> PathBuf {
    parse_flag(args, flag).unwrap_or_else(|| {
        eprintln!("{flag} requires a path");
        print_usage();
        std::process::exit(1);
    })
}

fn parse_flag<T: std::str::FromStr>(args: &[String], flag: &str) -> Option<T> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|v| v.parse().ok())
}

fn print_usage() {
    println!("Usage:");
    println!("  bayz-generate fit --embedding <VECTORS> --corpus <CORPUS> --out <MODEL>");
    println!("      [--config <CONFIG>] [--components N] [--seed N]");
    println!("  bayz-generate generate --embedding <VECTORS> --model <MODEL>");
    println!("      [--corpus <CORPUS>] [--config <CONFIG>] [--count N] [--seed N]");
    println!("      [--pitches] [--octave N] [--melody]");
    println!();
    println!("Files are JSON. Vectors: {{\"dimension\", \"tokens\", \"vectors\"}};");
    println!("corpus: [[\"word\", ...], ...].");
}
