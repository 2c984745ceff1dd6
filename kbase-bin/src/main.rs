mod commands;
mod config;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use kbase_chunker::Chunker;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

#[derive(Parser)]
#[command(name = "kbase")]
#[command(about = "Chunk knowledge-base documents for embedding and retrieval")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Max chars per chunk (overrides config)
    #[arg(long, global = true)]
    chunk_size: Option<usize>,

    /// Chars repeated between neighbouring chunks (overrides config)
    #[arg(long, global = true)]
    overlap: Option<usize>,

    /// -v for debug, -vv for trace; RUST_LOG takes precedence
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Chunk one file (stdin when omitted or "-") and print the chunks
    Chunk {
        file: Option<PathBuf>,

        /// Print chunk records as JSON
        #[arg(long)]
        json: bool,
    },
    /// Chunk a document tree and write a JSON manifest
    Ingest {
        #[arg(default_value = ".")]
        root: PathBuf,

        #[arg(long, value_name = "FILE")]
        out: Option<PathBuf>,
    },
    /// Chunk a document tree (or load a manifest) into the chunk store
    Index {
        #[arg(default_value = ".")]
        root: PathBuf,

        /// Use a manifest written by `ingest` instead of walking ROOT
        #[arg(long, value_name = "FILE")]
        manifest: Option<PathBuf>,

        #[arg(long, value_name = "FILE")]
        db: Option<PathBuf>,
    },
    /// Print the stored chunks of one document
    Show {
        /// Document path relative to the indexed root
        path: String,

        #[arg(long, value_name = "FILE")]
        db: Option<PathBuf>,
    },
    /// Document and chunk counts of the store
    Stats {
        #[arg(long, value_name = "FILE")]
        db: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    if let Err(e) = real_main(cli) {
        eprintln!("Error: {e:?}");
        std::process::exit(1);
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn real_main(cli: Cli) -> Result<()> {
    let mut config = Config::load(cli.config.as_deref())?;
    config.apply_env()?;
    if let Some(n) = cli.chunk_size {
        config.chunker.chunk_size = n;
    }
    if let Some(n) = cli.overlap {
        config.chunker.overlap = n;
    }
    let chunker: Chunker = config
        .chunker
        .build()
        .context("invalid chunker settings")?;
    let opts = commands::ingest_options(&config);

    match cli.command {
        Commands::Chunk { file, json } => commands::run_chunk(file.as_deref(), &chunker, json),
        Commands::Ingest { root, out } => {
            let out = out.unwrap_or_else(|| config.ingest.manifest.clone());
            commands::run_ingest(&root, &out, &chunker, &opts)
        }
        Commands::Index { root, manifest, db } => {
            let db = db.unwrap_or_else(|| config.store.path.clone());
            commands::run_index(&root, manifest.as_deref(), &db, &chunker, &opts)
        }
        Commands::Show { path, db } => {
            let db = db.unwrap_or_else(|| config.store.path.clone());
            commands::run_show(&path, &db)
        }
        Commands::Stats { db } => {
            let db = db.unwrap_or_else(|| config.store.path.clone());
            commands::run_stats(&db)
        }
    }
}
