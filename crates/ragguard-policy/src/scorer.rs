use tracing::warn;

use ragguard_core::traits::ToxicityScorer;

/// Scorer used when the classifier is off or could not be loaded.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledScorer;

impl ToxicityScorer for DisabledScorer {
    fn model_id(&self) -> &str { "disabled" }

    fn score(&self, _text: &str) -> anyhow::Result<f32> {
        Ok(0.0)
    }
}

/// Non-finite becomes 0.0, everything else is clamped to `[0, 1]`.
pub fn sanitize_probability(p: f32) -> f32 {
    if p.is_finite() { p.clamp(0.0, 1.0) } else { 0.0 }
}

/// Score `text`, degrading any scorer failure to 0.0.
pub fn score_or_zero(scorer: &dyn ToxicityScorer, text: &str) -> f32 {
    match scorer.score(text) {
        Ok(p) => sanitize_probability(p),
        Err(e) => {
            warn!(model = scorer.model_id(), "Toxicity scoring failed, using 0.0: {e:#}");
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Failing;

    impl ToxicityScorer for Failing {
        fn model_id(&self) -> &str { "failing" }
        fn score(&self, _text: &str) -> anyhow::Result<f32> {
            anyhow::bail!("backend offline")
        }
    }

    #[test]
    fn failures_and_odd_values_become_probabilities() {
        assert_eq!(score_or_zero(&Failing, "x"), 0.0);
        assert_eq!(score_or_zero(&DisabledScorer, "x"), 0.0);
        assert_eq!(sanitize_probability(f32::NAN), 0.0);
        assert_eq!(sanitize_probability(1.7), 1.0);
        assert_eq!(sanitize_probability(-0.2), 0.0);
        assert_eq!(sanitize_probability(0.42), 0.42);
    }
}
