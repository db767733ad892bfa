//! Guarded answering: input check, retrieval, generation, output check.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use ragguard_core::traits::LanguageModel;
use ragguard_core::types::SearchResult;
use ragguard_core::{Error, Result};
use ragguard_policy::{Action, DecisionLog, Guardrails, KeywordHit};
use ragguard_vector::{IndexSnapshot, Retriever};

use crate::prompt::build_prompt;

pub const REDACTED: &str = "[redacted]";

/// Anything that can produce ranked context for a query.
pub trait ContextSource: Send + Sync {
    fn retrieve(&self, query: &str, k: usize) -> Result<Vec<SearchResult>>;
}

impl<T: ContextSource + ?Sized> ContextSource for Arc<T> {
    fn retrieve(&self, query: &str, k: usize) -> Result<Vec<SearchResult>> {
        (**self).retrieve(query, k)
    }
}

impl<T: ContextSource + ?Sized> ContextSource for Box<T> {
    fn retrieve(&self, query: &str, k: usize) -> Result<Vec<SearchResult>> {
        (**self).retrieve(query, k)
    }
}

impl ContextSource for Retriever {
    fn retrieve(&self, query: &str, k: usize) -> Result<Vec<SearchResult>> {
        self.search(query, k)
    }
}

/// A retriever bound to one loaded index generation, for many queries
/// against the same index without reloading it.
pub struct PinnedIndex {
    retriever: Retriever,
    snapshot: IndexSnapshot,
}

impl PinnedIndex {
    pub fn new(retriever: Retriever, snapshot: IndexSnapshot) -> Self {
        Self { retriever, snapshot }
    }

    pub fn open(retriever: Retriever) -> Result<Self> {
        let snapshot = retriever.open_snapshot()?;
        Ok(Self::new(retriever, snapshot))
    }
}

impl ContextSource for PinnedIndex {
    fn retrieve(&self, query: &str, k: usize) -> Result<Vec<SearchResult>> {
        self.retriever.search_snapshot(&self.snapshot, query, k)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SafetyLog {
    pub input: DecisionLog,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<DecisionLog>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub decision: Action,
    pub answer: String,
    pub contexts: Vec<SearchResult>,
    pub safety_log: SafetyLog,
}

pub struct GuardedAnswerer<S: ContextSource> {
    source: S,
    guardrails: Arc<Guardrails>,
    model: Arc<dyn LanguageModel>,
}

impl<S: ContextSource> GuardedAnswerer<S> {
    pub fn new(source: S, guardrails: Arc<Guardrails>, model: Arc<dyn LanguageModel>) -> Self {
        Self { source, guardrails, model }
    }

    pub fn ask(&self, query: &str, k: usize) -> Result<Answer> {
        if k == 0 {
            return Err(Error::InvalidArgument("k must be at least 1".into()));
        }
        let input = self.guardrails.check(query);
        if input.is_blocked() {
            info!("Input blocked by policy");
            return Ok(Answer {
                decision: Action::Block,
                answer: self.guardrails.safe_respond(query).to_string(),
                contexts: Vec::new(),
                safety_log: SafetyLog { input: input.log, output: None },
            });
        }

        let contexts = self.source.retrieve(query, k)?;
        let prompt = build_prompt(query, &contexts);
        let raw = self.model.generate(&prompt).map_err(|e| Error::ModelUnavailable(format!("{e:#}")))?;
        debug!(contexts = contexts.len(), prompt_chars = prompt.len(), "generated answer");

        let output = self.guardrails.check(&raw);
        let answer = match output.decision {
            Action::Block => self.guardrails.safe_respond(query).to_string(),
            Action::Filter => self.redact(&raw, &output.log.keyword_hits),
            Action::Allow => raw,
        };
        info!(decision = %output.decision, "answered query");
        Ok(Answer {
            decision: output.decision,
            answer,
            contexts,
            safety_log: SafetyLog { input: input.log, output: Some(output.log) },
        })
    }

    /// Replace every matched keyword (whole word, any case) with [`REDACTED`].
    pub fn redact(&self, text: &str, hits: &[KeywordHit]) -> String {
        let mut out = text.to_string();
        for category in &self.guardrails.policy().categories {
            for keyword in &category.keywords {
                if hits.iter().any(|h| h.category == category.name && h.keyword == keyword.as_str()) {
                    out = keyword.pattern().replace_all(&out, REDACTED).into_owned();
                }
            }
        }
        out
    }
}
