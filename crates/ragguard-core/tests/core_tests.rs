use std::fs;
use std::io::Write;
use tempfile::TempDir;

use ragguard_core::chunker::Chunker;
use ragguard_core::config::{Config, EmbeddingBackend};
use ragguard_core::data_processor::DataProcessor;
use ragguard_core::Error;

#[test]
fn process_directory_single_small_file() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    let file_path = dir.join("a.txt");
    let mut f = fs::File::create(&file_path).unwrap();
    write!(f, "Short text").unwrap();

    let processor = DataProcessor::default();
    let corpus = processor.process_directory(dir).expect("process");

    assert_eq!(corpus.files.len(), 1);
    assert_eq!(corpus.chunks.len(), 1, "text shorter than chunk_size becomes one chunk");
    assert_eq!(corpus.chunks[0].text, "Short text");
    assert_eq!(corpus.chunks[0].source, file_path.to_string_lossy());
}

#[test]
fn process_directory_recurses_and_filters_extensions() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    fs::create_dir_all(dir.join("nested/deeper")).unwrap();
    fs::write(dir.join("b.txt"), "bravo").unwrap();
    fs::write(dir.join("nested/deeper/a.txt"), "alpha").unwrap();
    fs::write(dir.join("nested/skip.md"), "markdown is not indexed").unwrap();

    let corpus = DataProcessor::default().process_directory(dir).expect("process");
    assert_eq!(corpus.files.len(), 2);
    let texts: Vec<&str> = corpus.chunks.iter().map(|c| c.text.as_str()).collect();
    assert_eq!(texts, vec!["bravo", "alpha"], "files are visited in sorted path order");

    let with_md = DataProcessor::new(Chunker::default(), vec![".md".into(), "TXT".into()]);
    assert_eq!(with_md.process_directory(dir).expect("process").files.len(), 3);
}

#[test]
fn process_directory_chunks_long_documents_with_overlap() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("doc.txt"), "abcdefghij").unwrap();
    let processor = DataProcessor::new(Chunker::new(4, 1).unwrap(), vec!["txt".into()]);
    let corpus = processor.process_directory(tmp.path()).expect("process");
    let texts: Vec<&str> = corpus.chunks.iter().map(|c| c.text.as_str()).collect();
    assert_eq!(texts, vec!["abcd", "defg", "ghij", "j"]);
}

#[test]
fn empty_root_yields_empty_corpus() {
    let tmp = TempDir::new().unwrap();
    let corpus = DataProcessor::default().process_directory(tmp.path()).expect("process");
    assert!(corpus.files.is_empty());
    assert!(corpus.chunks.is_empty());
}

#[test]
fn missing_root_is_an_invalid_argument() {
    let tmp = TempDir::new().unwrap();
    let err = DataProcessor::default().process_directory(&tmp.path().join("nope")).unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));
}

#[test]
fn config_merges_file_and_env_overrides() {
    figment::Jail::expect_with(|jail| {
        jail.clear_env();
        jail.set_env("RUST_ENV", "test");
        jail.create_file(
            "config.toml",
            r#"
            [index]
            dir = "/var/lib/ragguard"
            chunk_size = 200

            [embedding]
            backend = "hash"
            "#,
        )?;
        jail.create_file("config.test.toml", "[index]\noverlap = 20\n")?;
        jail.set_env("APP_EVAL__CONCURRENCY", "8");

        let settings = Config::load().map_err(|e| e.to_string())?.settings().map_err(|e| e.to_string())?;
        assert_eq!(settings.index.dir, "/var/lib/ragguard");
        assert_eq!(settings.index.chunk_size, 200);
        assert_eq!(settings.index.overlap, 20);
        assert_eq!(settings.index.extensions, vec!["txt".to_string()]);
        assert_eq!(settings.embedding.backend, EmbeddingBackend::Hash);
        assert_eq!(settings.eval.concurrency, 8);

        jail.set_env("RAG_INDEX_DIR", "/tmp/legacy-index");
        jail.set_env("EMBED_MODEL", "custom/model");
        let settings = Config::load().map_err(|e| e.to_string())?.settings().map_err(|e| e.to_string())?;
        assert_eq!(settings.index.dir, "/tmp/legacy-index");
        assert_eq!(settings.embedding.model_id, "custom/model");

        jail.set_env("APP_INDEX__DIR", "/tmp/app-index");
        let config = Config::load().map_err(|e| e.to_string())?;
        let dir: String = config.get("index.dir").map_err(|e| e.to_string())?;
        assert_eq!(dir, "/tmp/app-index", "APP_ variables take precedence");
        Ok(())
    });
}

#[test]
fn config_rejects_zero_batch_size() {
    figment::Jail::expect_with(|jail| {
        jail.clear_env();
        jail.set_env("APP_INDEX__EMBED_BATCH_SIZE", "0");
        assert!(matches!(Config::load(), Err(Error::InvalidConfig(_))));
        Ok(())
    });
}
