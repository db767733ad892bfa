use ragguard_core::config::{EmbeddingBackend, EmbeddingSettings};
use ragguard_embed::get_default_embedder;

#[test]
fn hash_backend_shapes_and_determinism() {
    let settings = EmbeddingSettings { backend: EmbeddingBackend::Hash, hash_dim: 256, ..EmbeddingSettings::default() };
    let embedder = get_default_embedder(&settings).expect("embedder");
    assert_eq!(embedder.model_id(), "hash:xxh64:d256");

    let texts = vec!["hello world".to_string(), "hello world".to_string(), "goodbye moon".to_string()];
    let embs = embedder.embed_batch(&texts).expect("embed_batch");
    assert_eq!(embs.len(), 3);
    let v1 = &embs[0];
    assert_eq!(v1.len(), 256, "embedding dim follows hash_dim");

    let norm: f32 = v1.iter().map(|x| x * x).sum::<f32>().sqrt();
    assert!((norm - 1.0).abs() <= 1e-3, "vector is L2-normalized (norm={norm})");

    for (a, b) in v1.iter().zip(embs[1].iter()) { assert!((a - b).abs() <= 1e-6); }
    assert_ne!(embs[0], embs[2]);
}

#[test]
fn local_backend_without_model_dir_fails() {
    std::env::remove_var("APP_USE_FAKE_EMBEDDINGS");
    let tmp = tempfile::tempdir().unwrap();
    let settings = EmbeddingSettings {
        model_dir: Some(tmp.path().join("missing").to_string_lossy().to_string()),
        ..EmbeddingSettings::default()
    };
    assert!(get_default_embedder(&settings).is_err());
}

#[test]
fn toxicity_scorer_requires_weights() {
    let tmp = tempfile::tempdir().unwrap();
    assert!(ragguard_embed::load_toxicity_scorer("unitary/unbiased-toxic-roberta", Some(tmp.path())).is_err());
}
