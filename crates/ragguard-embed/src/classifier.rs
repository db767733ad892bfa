//! Sequence-classification toxicity scorer (RoBERTa / XLM-R checkpoints such
//! as `unitary/unbiased-toxic-roberta`).

use std::path::Path;

use anyhow::{anyhow, Result};
use candle_core::{DType, Device, Tensor, D};
use candle_nn::VarBuilder;
use candle_transformers::models::xlm_roberta::{Config as XLMRobertaConfig, XLMRobertaForSequenceClassification};
use tokenizers::Tokenizer;
use tracing::info;

use ragguard_core::traits::ToxicityScorer;

use crate::device::select_device;
use crate::model_dir::{load_weights, read_config_json};
use crate::tokenize::{configure_tokenizer, tokenize_batch};

const MAX_LEN: usize = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Activation {
    Softmax,
    Sigmoid,
}

pub struct ToxicityClassifier {
    model: XLMRobertaForSequenceClassification,
    tokenizer: Tokenizer,
    device: Device,
    model_id: String,
    toxic_index: usize,
    activation: Activation,
    pad_id: u32,
}

/// Picks the label used as "toxic": the first label whose name contains
/// `toxic`, else the last label (binary heads put the positive class last).
fn toxic_label_index(config: &serde_json::Value, num_labels: usize) -> usize {
    let by_name = config.get("id2label").and_then(|m| m.as_object()).and_then(|labels| {
        labels
            .iter()
            .filter(|(_, name)| name.as_str().is_some_and(|n| n.to_lowercase().contains("toxic")))
            .filter_map(|(idx, _)| idx.parse::<usize>().ok())
            .min()
    });
    by_name.unwrap_or(num_labels.saturating_sub(1))
}

impl ToxicityClassifier {
    pub fn load(model_dir: &Path, model_id: &str) -> Result<Self> {
        let device = select_device();
        info!(model = model_id, dir = %model_dir.display(), "loading toxicity classifier");
        let tokenizer_path = model_dir.join("tokenizer.json");
        let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow!("Failed to load tokenizer from {}: {}", tokenizer_path.display(), e))?;
        let (raw_config, config_value) = read_config_json(model_dir)?;
        let config: XLMRobertaConfig = serde_json::from_str(&raw_config)?;
        let num_labels = config_value.get("id2label").and_then(|m| m.as_object()).map_or(2, serde_json::Map::len);
        let activation = match config_value.get("problem_type").and_then(serde_json::Value::as_str) {
            Some("multi_label_classification") => Activation::Sigmoid,
            _ => Activation::Softmax,
        };
        let toxic_index = toxic_label_index(&config_value, num_labels);
        let weights = load_weights(model_dir, &device)?;
        let vb = VarBuilder::from_tensors(weights, DType::F32, &device);
        let model = XLMRobertaForSequenceClassification::new(num_labels, &config, vb)?;
        let pad_id = tokenizer.token_to_id("<pad>").unwrap_or(1);
        configure_tokenizer(&mut tokenizer, MAX_LEN, pad_id)?;
        info!(model = model_id, num_labels, toxic_index, "toxicity classifier loaded");
        Ok(Self { model, tokenizer, device, model_id: model_id.to_string(), toxic_index, activation, pad_id })
    }
}

impl ToxicityScorer for ToxicityClassifier {
    fn model_id(&self) -> &str { &self.model_id }

    fn score(&self, text: &str) -> Result<f32> {
        let (input_ids, attention_mask) = tokenize_batch(&self.tokenizer, &[text.to_string()], self.pad_id, &self.device)?;
        let token_type_ids = Tensor::zeros(input_ids.shape(), DType::U32, &self.device)?;
        let logits = self.model.forward(&input_ids, &attention_mask, &token_type_ids)?;
        let probs = match self.activation {
            Activation::Softmax => candle_nn::ops::softmax(&logits, D::Minus1)?,
            Activation::Sigmoid => candle_nn::ops::sigmoid(&logits)?,
        };
        let row: Vec<f32> = probs.squeeze(0)?.to_device(&Device::Cpu)?.to_vec1()?;
        row.get(self.toxic_index).copied().ok_or_else(|| anyhow!("classifier returned {} labels", row.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toxic_label_prefers_named_label() {
        let cfg = serde_json::json!({"id2label": {"0": "toxicity", "1": "severe_toxicity", "2": "obscene"}});
        assert_eq!(toxic_label_index(&cfg, 3), 0);
    }

    #[test]
    fn toxic_label_falls_back_to_last() {
        let cfg = serde_json::json!({"id2label": {"0": "LABEL_0", "1": "LABEL_1"}});
        assert_eq!(toxic_label_index(&cfg, 2), 1);
        assert_eq!(toxic_label_index(&serde_json::json!({}), 2), 1);
    }
}
