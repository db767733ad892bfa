use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use tracing::debug;

/// Locate a local model directory.
///
/// Order: the explicitly configured directory, `APP_MODEL_DIR`, `MODEL_DIR`,
/// then `models/<name>` and `../models/<name>` where `<name>` is the last path
/// segment of the model id (`sentence-transformers/all-MiniLM-L6-v2` →
/// `all-MiniLM-L6-v2`). The env fallbacks are skipped when `use_env` is false
/// so that two different models can be resolved in one process.
pub fn resolve_model_dir(configured: Option<&Path>, model_id: &str, use_env: bool) -> Result<PathBuf> {
    if let Some(p) = configured {
        if p.exists() { debug!(dir = %p.display(), "using configured model dir"); return Ok(p.to_path_buf()); }
        return Err(anyhow!("configured model directory {} does not exist", p.display()));
    }
    if use_env {
        for var in ["APP_MODEL_DIR", "MODEL_DIR"] {
            if let Ok(dir) = std::env::var(var) {
                let p = PathBuf::from(&dir);
                if p.exists() { debug!(dir = %p.display(), "using {var}"); return Ok(p); }
            }
        }
    }
    let name = model_id.rsplit('/').next().unwrap_or(model_id);
    for root in ["models", "../models"] {
        let p = Path::new(root).join(name);
        if p.exists() { debug!(dir = %p.display(), "using model dir"); return Ok(p); }
    }
    Err(anyhow!("Could not locate a model directory for '{model_id}'"))
}

/// Load every tensor of a checkpoint, preferring safetensors over a pickled
/// PyTorch state dict.
pub fn load_weights(
    model_dir: &Path,
    device: &candle_core::Device,
) -> Result<std::collections::HashMap<String, candle_core::Tensor>> {
    let safetensors = model_dir.join("model.safetensors");
    if safetensors.exists() {
        return Ok(candle_core::safetensors::load(&safetensors, device)?);
    }
    let pickle = model_dir.join("pytorch_model.bin");
    if pickle.exists() {
        let tensors = candle_core::pickle::read_all(&pickle)?;
        return tensors
            .into_iter()
            .map(|(name, t)| Ok((name, t.to_device(device)?)))
            .collect();
    }
    Err(anyhow!("no model.safetensors or pytorch_model.bin in {}", model_dir.display()))
}

pub fn read_config_json(model_dir: &Path) -> Result<(String, serde_json::Value)> {
    let config_path = model_dir.join("config.json");
    let raw = std::fs::read_to_string(&config_path)
        .map_err(|e| anyhow!("Failed to read {}: {}", config_path.display(), e))?;
    let value: serde_json::Value = serde_json::from_str(&raw)?;
    Ok((raw, value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configured_dir_wins_and_must_exist() {
        let tmp = tempfile::tempdir().unwrap();
        let got = resolve_model_dir(Some(tmp.path()), "org/model", false).unwrap();
        assert_eq!(got, tmp.path());
        assert!(resolve_model_dir(Some(&tmp.path().join("missing")), "org/model", false).is_err());
    }

    #[test]
    fn missing_weights_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(load_weights(tmp.path(), &candle_core::Device::Cpu).is_err());
    }
}
