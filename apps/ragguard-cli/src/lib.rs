//! Shared wiring for the `ragguard*` binaries: logging, configuration and
//! construction of the retriever, guardrails and answerer.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use ragguard_core::config::{expand_path, AppConfig, Config};
use ragguard_core::Error;
use ragguard_embed::{get_default_embedder, load_toxicity_scorer};
use ragguard_pipeline::{ContextSource, EchoModel, GuardedAnswerer, PinnedIndex};
use ragguard_policy::Guardrails;
use ragguard_vector::{Retriever, RetrieverConfig};

/// Logs go to stderr so stdout stays machine readable.
pub fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Merged configuration, with an optional index directory override.
pub fn load_settings(index_dir: Option<&Path>) -> Result<AppConfig> {
    let mut settings = Config::load().context("loading configuration")?.settings()?;
    if let Some(dir) = index_dir {
        settings.index.dir = dir.display().to_string();
    }
    Ok(settings)
}

pub fn open_retriever(settings: &AppConfig) -> Result<Retriever> {
    let embedder = get_default_embedder(&settings.embedding).context("loading embedding model")?;
    Ok(Retriever::new(RetrieverConfig::from_settings(settings), embedder)?)
}

pub fn load_guardrails(settings: &AppConfig) -> Result<Guardrails> {
    let model_dir: Option<PathBuf> = settings.policy.classifier_model_dir.as_deref().map(expand_path);
    let guardrails = Guardrails::load(&settings.policy_path(), |classifier| {
        load_toxicity_scorer(&classifier.model_name, model_dir.as_deref())
    })?;
    Ok(guardrails)
}

pub fn answerer<S: ContextSource>(source: S, guardrails: Guardrails) -> GuardedAnswerer<S> {
    GuardedAnswerer::new(source, Arc::new(guardrails), Arc::new(EchoModel))
}

/// Pin the active index generation for a batch of queries. Without an index
/// the plain retriever is used, so blocked prompts still get their policy
/// decision and the rest report the missing index one by one.
pub fn context_source(retriever: Retriever) -> Result<Box<dyn ContextSource>> {
    match retriever.open_snapshot() {
        Ok(snapshot) => {
            info!(
                generation = %snapshot.generation_dir().display(),
                chunks = snapshot.len(),
                "pinned index generation"
            );
            Ok(Box::new(PinnedIndex::new(retriever, snapshot)))
        }
        Err(Error::NotFound(msg)) => {
            warn!("{msg}; prompts that need retrieval will fail");
            Ok(Box::new(retriever))
        }
        Err(e) => Err(e.into()),
    }
}

/// One line of an evaluation prompt file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EvalPrompt {
    pub prompt: String,
    pub k: Option<usize>,
}

/// Parse a JSONL prompt file, skipping blank lines.
pub fn parse_prompts(source: &str) -> Result<Vec<EvalPrompt>> {
    source
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(n, line)| serde_json::from_str(line).with_context(|| format!("prompt file line {}", n + 1)))
        .collect()
}

pub fn output_name(index: usize) -> String {
    format!("out_{index:03}.json")
}
