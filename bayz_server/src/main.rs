// CLI entry point for a bayz live-coding session.
//
// Loads the embedding and fitted model, starts the commit/fetch server, and
// builds a generation cache. Commands are then read from stdin, one per
// line:
//
//   next      generate (or replay) a sequence and add it to the band
//   commit    send the band to the playback client, then rewind the cache
//   rewind    replay cached sequences from the start
//   reset     drop cached sequences; the next `next` samples fresh ones
//   clear     remove every line from the band
//   quit      stop the server and exit
//
// Usage:
//   bayz-live [OPTIONS]
//     --config <FILE>       LiveConfig JSON (optional)
//     --port <PORT>         Listen port (default: 42700)
//     --embedding <FILE>    Keyed-vector file
//     --model <FILE>        Fitted model file
//     --corpus <FILE>       Corpus for a Markov type-id source (optional)
//     --seed <N>            Generation seed

use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;

use bayz_model::{
    BoxedTypeSource, GenerationCache, KeyedVectors, MarkovTypeSource, MixtureTypeSource,
    ModelError, Sequencer, TypeModel, boxed, load_corpus,
};
use bayz_server::band::Band;
use bayz_server::config::LiveConfig;
use bayz_server::server::{ServerHandle, start_server};
use tracing_subscriber::EnvFilter;

type LiveCache = GenerationCache<KeyedVectors, BoxedTypeSource>;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let config = parse_args();
    let mut cache = match build_cache(&config) {
        Ok(cache) => cache,
        Err(e) => {
            eprintln!("Failed to load model: {e}");
            std::process::exit(1);
        }
    };

    let (handle, addr) = match start_server(config.server.clone()) {
        Ok(result) => result,
        Err(e) => {
            eprintln!("Failed to start server: {e}");
            std::process::exit(1);
        }
    };
    println!("bayz server listening on http://{addr}");
    println!("Commands: next, commit, rewind, reset, clear, quit");

    let mut band = Band::new(config.cycle_length);
    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let Ok(line) = line else { break };
        match run_command(line.trim(), &config, &mut cache, &mut band, &handle) {
            Ok(true) => {}
            Ok(false) => break,
            Err(e) => eprintln!("error: {e}"),
        }
    }

    println!("Shutting down...");
    handle.stop();
}

/// Execute one command. Returns `Ok(false)` when the session should end.
fn run_command(
    command: &str,
    config: &LiveConfig,
    cache: &mut LiveCache,
    band: &mut Band,
    handle: &ServerHandle,
) -> Result<bool, ModelError> {
    match command {
        "" => {}
        "next" => {
            let sequence = cache.next()?;
            let delimiter = cache.sequencer().delimiter();
            let words: Vec<String> = sequence.iter().map(|t| t.join(delimiter)).collect();
            let notes = band.add_sequence_line(&sequence, &config.line);
            println!("[{}] {} ({notes} notes)", cache.cursor(), words.join(" "));
        }
        "commit" => {
            band.commit(handle);
            cache.rewind();
            println!("Committed {} lines", band.lines().len());
        }
        "rewind" => cache.rewind(),
        "reset" => cache.reset(),
        "clear" => band.clear(),
        "quit" | "exit" => return Ok(false),
        other => println!("Unknown command: {other}"),
    }
    Ok(true)
}

fn build_cache(config: &LiveConfig) -> Result<LiveCache, ModelError> {
    let embedding = KeyedVectors::load(&config.embedding_path)?;
    let mut model = TypeModel::new(embedding, config.bayz.model.clone())?;
    model.load(&config.model_path)?;

    let generation = &config.bayz.generation;
    let lengths = generation.min_length..=generation.max_length;
    let source = match &config.corpus_path {
        Some(path) => {
            let labelled = model.label_sequences(&load_corpus(path)?)?;
            boxed(MarkovTypeSource::fit(&labelled, model.component_count(), lengths)?)
        }
        None => boxed(MixtureTypeSource::new(model.mixture(), lengths)?),
    };
    let sequencer = Sequencer::new(Arc::new(model), generation.delimiter.clone());
    GenerationCache::from_config(sequencer, source, generation)
}

/// Parse command-line arguments into a `LiveConfig`. Uses simple
/// `std::env::args()` matching, no clap dependency.
fn parse_args() -> LiveConfig {
    let args: Vec<String> = std::env::args().collect();
    let mut config = match flag_value(&args, "--config") {
        Some(path) => LiveConfig::load(&PathBuf::from(path)).unwrap_or_else(|e| {
            eprintln!("Failed to read config: {e}");
            std::process::exit(1);
        }),
        None => LiveConfig::default(),
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" => i += 1,
            "--port" => {
                i += 1;
                config.server.port = parsed(&args, i, "--port requires a valid port number");
            }
            "--embedding" => {
                i += 1;
                config.embedding_path = parsed(&args, i, "--embedding requires a path");
            }
            "--model" => {
                i += 1;
                config.model_path = parsed(&args, i, "--model requires a path");
            }
            "--corpus" => {
                i += 1;
                config.corpus_path = Some(parsed(&args, i, "--corpus requires a path"));
            }
            "--seed" => {
                i += 1;
                config.bayz.generation.seed = Some(parsed(&args, i, "--seed requires a number"));
            }
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            other => {
                eprintln!("Unknown argument: {other}");
                print_usage();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    config
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

fn parsed<T: std::str::FromStr>(args: &[String], i: usize, message: &str) -> T {
    args.get(i).and_then(|s| s.parse().ok()).unwrap_or_else(|| {
        eprintln!("{message}");
        std::process::exit(1);
    })
}

fn print_usage() {
    println!("Usage: bayz-live [OPTIONS]");
    println!();
    println!("Options:");
    println!("  --config <FILE>       LiveConfig JSON");
    println!("  --port <PORT>         Listen port (default: 42700)");
    println!("  --embedding <FILE>    Keyed-vector file");
    println!("  --model <FILE>        Fitted model file");
    println!("  --corpus <FILE>       Corpus for a Markov type-id source");
    println!("  --seed <N>            Generation seed");
    println!("  --help, -h            Show this help");
}
