//! Policy evaluation: keyword scan, optional classifier scoring, per-category
//! violations and a single reduced decision with its audit log.

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use ragguard_core::traits::ToxicityScorer;
use ragguard_core::Result;

use crate::policy::{Action, ClassifierSettings, InvokeMode, Policy};
use crate::scorer::{score_or_zero, DisabledScorer};

/// Fixed refusal returned in place of blocked content.
pub const SAFE_RESPONSE: &str =
    "I'm here to help, but I can't assist with that request. If you have another question or want general information, let me know.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeywordHit {
    pub category: String,
    pub keyword: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClassifierLog {
    pub toxic_prob: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Violation {
    pub category: String,
    pub action: Action,
    pub toxic_prob: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecisionLog {
    pub keyword_hits: Vec<KeywordHit>,
    pub classifier: ClassifierLog,
    pub decisions: Vec<Violation>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Verdict {
    pub decision: Action,
    pub log: DecisionLog,
}

impl Verdict {
    pub fn is_blocked(&self) -> bool { self.decision == Action::Block }
}

/// Policy engine. Immutable after construction and safe to share.
pub struct Guardrails {
    policy: Policy,
    scorer: Arc<dyn ToxicityScorer>,
}

impl Guardrails {
    pub fn new(policy: Policy, scorer: Arc<dyn ToxicityScorer>) -> Self {
        Self { policy, scorer }
    }

    pub fn without_classifier(policy: Policy) -> Self {
        Self::new(policy, Arc::new(DisabledScorer))
    }

    /// Load the policy at `path` and, if the policy enables the classifier,
    /// obtain a scorer from `load_scorer`. A loader failure is logged and
    /// replaced by [`DisabledScorer`].
    pub fn load<F>(path: &Path, load_scorer: F) -> Result<Self>
    where
        F: FnOnce(&ClassifierSettings) -> anyhow::Result<Arc<dyn ToxicityScorer>>,
    {
        let policy = Policy::load(path)?;
        let scorer: Arc<dyn ToxicityScorer> = if policy.classifier.enabled {
            match load_scorer(&policy.classifier) {
                Ok(s) => {
                    info!(model = s.model_id(), "toxicity classifier ready");
                    s
                }
                Err(e) => {
                    warn!(model = %policy.classifier.model_name, "Classifier unavailable, scoring disabled: {e:#}");
                    Arc::new(DisabledScorer)
                }
            }
        } else {
            Arc::new(DisabledScorer)
        };
        Ok(Self::new(policy, scorer))
    }

    pub fn policy(&self) -> &Policy { &self.policy }

    pub fn scorer_id(&self) -> &str { self.scorer.model_id() }

    fn keyword_hits(&self, text: &str) -> Vec<KeywordHit> {
        self.policy
            .categories
            .iter()
            .flat_map(|cat| {
                cat.keywords
                    .iter()
                    .filter(|k| k.is_match(text))
                    .map(|k| KeywordHit { category: cat.name.clone(), keyword: k.as_str().to_string() })
            })
            .collect()
    }

    fn classifier_score(&self, text: &str, any_hit: bool) -> f32 {
        let settings = &self.policy.classifier;
        let wanted = settings.enabled && (any_hit || settings.invoke == InvokeMode::Always);
        if wanted { score_or_zero(self.scorer.as_ref(), text) } else { 0.0 }
    }

    pub fn check(&self, text: &str) -> Verdict {
        let keyword_hits = self.keyword_hits(text);
        let toxic_prob = self.classifier_score(text, !keyword_hits.is_empty());

        let decisions: Vec<Violation> = self
            .policy
            .categories
            .iter()
            .filter(|cat| keyword_hits.iter().any(|h| h.category == cat.name) || toxic_prob >= cat.threshold)
            .map(|cat| Violation { category: cat.name.clone(), action: cat.action, toxic_prob })
            .collect();

        let mut decision = Action::Allow;
        let mut best: Option<&Violation> = None;
        for v in &decisions {
            let better = best.is_none_or(|b| (v.action, v.toxic_prob) > (b.action, b.toxic_prob));
            if better {
                best = Some(v);
                decision = v.action;
            }
        }

        debug!(decision = %decision, hits = keyword_hits.len(), toxic_prob, violations = decisions.len(), "policy check");
        Verdict { decision, log: DecisionLog { keyword_hits, classifier: ClassifierLog { toxic_prob }, decisions } }
    }

    /// Refusal shown instead of blocked content. Never echoes the input.
    pub fn safe_respond(&self, _original: &str) -> &'static str {
        SAFE_RESPONSE
    }
}
