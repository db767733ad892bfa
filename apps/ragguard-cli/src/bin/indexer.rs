use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use ragguard_cli::{init_logging, load_settings, open_retriever};

#[derive(Parser)]
#[command(name = "ragguard-indexer", version, about = "Build the retrieval index from a document directory")]
struct Cli {
    /// Document root to index
    #[arg(long)]
    path: PathBuf,

    /// Index directory (overrides index.dir from config)
    #[arg(long)]
    index_dir: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let settings = load_settings(cli.index_dir.as_deref())?;

    let retriever = open_retriever(&settings)?;
    info!(docs = %cli.path.display(), index = %retriever.index_dir().display(), "starting indexing run");
    let report = retriever.build(&cli.path)?;
    println!("Indexed {} chunks from {} files -> {}", report.chunks, report.files, report.location);
    Ok(())
}
