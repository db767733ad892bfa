//! Replay a JSONL prompt file through the guarded pipeline and write one JSON
//! result per prompt (`out_000.json`, `out_001.json`, ...).

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use futures::stream::{self, StreamExt};
use tracing::{error, info};

use ragguard_cli::{
    answerer, context_source, init_logging, load_guardrails, load_settings, open_retriever, output_name, parse_prompts,
};

#[derive(Parser)]
#[command(name = "ragguard-eval", version, about = "Batch-evaluate prompts against the guarded pipeline")]
struct Cli {
    /// JSONL file with {"prompt": ..., "k": ...} per line
    #[arg(long, default_value = "eval/prompts_example.jsonl")]
    file: PathBuf,

    /// Where out_NNN.json files are written
    #[arg(long, default_value = "eval/logs")]
    out_dir: PathBuf,

    /// Prompts evaluated at once (defaults to eval.concurrency)
    #[arg(long)]
    concurrency: Option<usize>,

    /// Index directory (overrides index.dir from config)
    #[arg(long)]
    index_dir: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let settings = load_settings(cli.index_dir.as_deref())?;

    let raw = fs::read_to_string(&cli.file).with_context(|| format!("reading {}", cli.file.display()))?;
    let prompts = parse_prompts(&raw)?;
    fs::create_dir_all(&cli.out_dir)?;

    let source = context_source(open_retriever(&settings)?)?;
    let pipeline = Arc::new(answerer(source, load_guardrails(&settings)?));
    let concurrency = cli.concurrency.unwrap_or(settings.eval.concurrency).max(1);
    let default_k = settings.eval.default_k;
    info!(prompts = prompts.len(), concurrency, "starting evaluation");

    let mut results = stream::iter(prompts.into_iter().enumerate())
        .map(|(i, p)| {
            let pipeline = Arc::clone(&pipeline);
            async move {
                let k = p.k.unwrap_or(default_k);
                let res = tokio::task::spawn_blocking(move || pipeline.ask(&p.prompt, k)).await;
                (i, res)
            }
        })
        .buffered(concurrency);

    let mut failures = 0usize;
    while let Some((i, res)) = results.next().await {
        match res {
            Ok(Ok(answer)) => {
                let path = cli.out_dir.join(output_name(i));
                fs::write(&path, serde_json::to_string_pretty(&answer)?)?;
                println!("{i} {}", answer.decision);
            }
            Ok(Err(e)) => {
                error!("prompt {i} failed: {e}");
                println!("{i} error");
                failures += 1;
            }
            Err(e) => {
                error!("prompt {i} panicked: {e}");
                println!("{i} error");
                failures += 1;
            }
        }
    }

    if failures > 0 {
        bail!("{failures} prompt(s) failed");
    }
    info!(out_dir = %cli.out_dir.display(), "evaluation finished");
    Ok(())
}
