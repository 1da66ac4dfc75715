//! Runs a sandboxed script against a JSON document standing in for the
//! privileged graph, then prints the document.
//!
//! Usage:
//!   warden <file.js>                 # Run a script file
//!   warden -e "code"                 # Run inline code
//!   warden -g graph.json -e "code"   # Start from a custom document
//!
//! `RUST_LOG=debug` (or `--debug`) shows every access as it crosses the
//! channel.

use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use clap::Parser;
use log::LevelFilter;
use warden::channel::ChannelBuffer;
use warden::config::WorkerConfig;
use warden::coordinator::{Coordinator, JsonDocument};
use warden::runner::capability::classifier::ClassifierMode;
use warden::worker::{Dispatch, HostMessage, Worker};

#[derive(Parser)]
#[command(name = "warden", about = "Run a sandboxed script against a JSON document", version)]
struct Cli {
    /// Script file to run.
    file: Option<PathBuf>,
    /// Inline script, instead of a file.
    #[arg(short, long, conflicts_with = "file")]
    eval: Option<String>,
    /// JSON document the script's accesses resolve against.
    #[arg(short, long)]
    graph: Option<PathBuf>,
    /// TOML worker configuration.
    #[arg(short, long)]
    config: Option<PathBuf>,
    #[arg(long)]
    debug: bool,
    #[arg(long)]
    timeout_ms: Option<u64>,
    /// schema, lookahead or hybrid.
    #[arg(long, value_parser = parse_mode)]
    classifier: Option<ClassifierMode>,
}

fn parse_mode(s: &str) -> Result<ClassifierMode, String> {
    serde_json::from_value(serde_json::Value::String(s.to_string()))
        .map_err(|_| format!("unknown classifier '{}', expected schema, lookahead or hybrid", s))
}

fn main() {
    let cli = Cli::parse();

    let mut logger = env_logger::Builder::from_default_env();
    if cli.debug {
        logger.filter_level(LevelFilter::Debug);
    }
    logger.init();

    let source = match (&cli.eval, &cli.file) {
        (Some(code), _) => code.clone(),
        (None, Some(file)) => read_or_exit(file),
        (None, None) => {
            eprintln!("Nothing to run: pass a script file or -e \"code\".");
            process::exit(2);
        }
    };

    let mut config = match &cli.config {
        Some(path) => WorkerConfig::load(path).unwrap_or_else(|e| {
            eprintln!("{}", e);
            process::exit(2);
        }),
        None => WorkerConfig::default(),
    };
    config.debug |= cli.debug;
    if let Some(timeout_ms) = cli.timeout_ms {
        config.timeout_ms = timeout_ms;
    }
    if let Some(mode) = cli.classifier {
        config.classifier = mode;
    }

    let document = match &cli.graph {
        Some(path) => match serde_json::from_str(&read_or_exit(path)) {
            Ok(value) => JsonDocument::new(value),
            Err(e) => {
                eprintln!("Invalid graph document '{}': {}", path.display(), e);
                process::exit(2);
            }
        },
        None => JsonDocument::browser_default(),
    };

    let buffer = match ChannelBuffer::new(config.buffer_slots) {
        Ok(buffer) => Arc::new(buffer),
        Err(e) => {
            eprintln!("{}", e);
            process::exit(2);
        }
    };

    let (access_tx, access_rx) = crossbeam_channel::unbounded();
    let coordinator = match Coordinator::new(Arc::clone(&buffer), document).spawn(access_rx) {
        Ok(handle) => handle,
        Err(e) => {
            eprintln!("Cannot start coordinator: {}", e);
            process::exit(1);
        }
    };

    let mut worker = Worker::new(access_tx);
    worker.handle(HostMessage::handshake(buffer).with_config(config));
    let outcome = worker.handle(HostMessage::init(source));
    // Dropping the worker closes the accessor queue and stops the coordinator.
    drop(worker);

    let document = match coordinator.join() {
        Ok(document) => document,
        Err(_) => {
            eprintln!("Coordinator thread panicked");
            process::exit(1);
        }
    };
    match serde_json::to_string_pretty(document.root()) {
        Ok(text) => println!("{}", text),
        Err(e) => eprintln!("Cannot print document: {}", e),
    }

    match outcome {
        Dispatch::Finished(Ok(())) => {}
        Dispatch::Finished(Err(e)) => {
            eprintln!("{}", e);
            process::exit(1);
        }
        Dispatch::Skipped(e) => {
            eprintln!("{}", e);
            process::exit(1);
        }
        Dispatch::Idle | Dispatch::Ignored(_) => process::exit(1),
    }
}

fn read_or_exit(path: &Path) -> String {
    fs::read_to_string(path).unwrap_or_else(|e| {
        eprintln!("Error reading file '{}': {}", path.display(), e);
        process::exit(2);
    })
}
