/// Maps text to dense vectors of a fixed dimension.
///
/// Implementations must be deterministic for a given `model_id`; the id is
/// persisted next to every index so that queries are never embedded with a
/// different model than the one used at build time.
pub trait Embedder: Send + Sync {
    /// Stable identifier for the model (e.g. `sentence-transformers/all-MiniLM-L6-v2`).
    fn model_id(&self) -> &str;
    fn dim(&self) -> usize;
    fn max_len(&self) -> usize;
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;
}

/// Scores a text span with a toxicity probability in `[0, 1]`.
pub trait ToxicityScorer: Send + Sync {
    fn model_id(&self) -> &str;
    fn score(&self, text: &str) -> anyhow::Result<f32>;
}

/// Opaque text-generation backend.
pub trait LanguageModel: Send + Sync {
    fn generate(&self, prompt: &str) -> anyhow::Result<String>;
}
