//! ragguard: index documents, search them, check text against the policy and
//! ask guarded questions.
//!
//! Usage:
//!   ragguard index ./docs
//!   ragguard search "how do I store water" --k 4
//!   ragguard check "some text"
//!   ragguard ask "how do I store water" --k 4

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use ragguard_cli::{answerer, init_logging, load_guardrails, load_settings, open_retriever};

#[derive(Parser)]
#[command(name = "ragguard", version, about = "Retrieval-augmented answering with a safety policy")]
struct Cli {
    /// Index directory (overrides index.dir from config)
    #[arg(long, global = true)]
    index_dir: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Chunk, embed and index every matching file under a directory
    Index { docs: PathBuf },
    /// Top-k chunks for a query, as JSON
    Search {
        query: String,
        #[arg(short, long)]
        k: Option<usize>,
    },
    /// Policy decision and audit log for a piece of text, as JSON
    Check { text: String },
    /// Guarded answer for a query, as JSON
    Ask {
        query: String,
        #[arg(short, long)]
        k: Option<usize>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let settings = load_settings(cli.index_dir.as_deref())?;

    match cli.command {
        Command::Index { docs } => {
            let report = open_retriever(&settings)?.build(&docs)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Search { query, k } => {
            let hits = open_retriever(&settings)?.search(&query, k.unwrap_or(settings.eval.default_k))?;
            println!("{}", serde_json::to_string_pretty(&hits)?);
        }
        Command::Check { text } => {
            let verdict = load_guardrails(&settings)?.check(&text);
            println!("{}", serde_json::to_string_pretty(&verdict)?);
        }
        Command::Ask { query, k } => {
            let a = answerer(open_retriever(&settings)?, load_guardrails(&settings)?);
            let answer = a.ask(&query, k.unwrap_or(settings.eval.default_k))?;
            println!("{}", serde_json::to_string_pretty(&answer)?);
        }
    }
    Ok(())
}
