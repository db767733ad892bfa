//! ragguard-policy
//!
//! Loads a safety policy (YAML or TOML) and evaluates text against it,
//! producing an `allow` / `filter` / `block` decision with an audit log.

pub mod engine;
pub mod policy;
pub mod scorer;

pub use engine::{ClassifierLog, DecisionLog, Guardrails, KeywordHit, Verdict, Violation, SAFE_RESPONSE};
pub use policy::{Action, Category, ClassifierSettings, InvokeMode, Keyword, Policy};
pub use scorer::{sanitize_probability, score_or_zero, DisabledScorer};
