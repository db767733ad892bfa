//! ragguard-core
//!
//! Shared domain types, error taxonomy, configuration and the capability
//! traits (embedding, toxicity scoring, text generation) used by the
//! retrieval, policy and pipeline crates.

pub mod chunker;
pub mod config;
pub mod data_processor;
pub mod error;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
