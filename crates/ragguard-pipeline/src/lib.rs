//! ragguard-pipeline
//!
//! Wires retrieval, the language model and the policy engine into a single
//! guarded `ask` call.

pub mod answer;
pub mod llm;
pub mod prompt;

pub use answer::{Answer, ContextSource, GuardedAnswerer, PinnedIndex, SafetyLog, REDACTED};
pub use llm::EchoModel;
pub use prompt::build_prompt;
