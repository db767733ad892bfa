use ragguard_core::types::SearchResult;

/// Assemble the answering prompt from retrieved chunks, best first.
pub fn build_prompt(query: &str, contexts: &[SearchResult]) -> String {
    let context = contexts.iter().map(|c| c.text.as_str()).collect::<Vec<_>>().join("\n\n");
    format!(
        "You are a helpful assistant. Use the provided context to answer.\n\
         Context:\n\
         {context}\n\
         \n\
         User question: {query}\n\
         Answer briefly and cite the most relevant sources by filename.\n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragguard_core::types::ChunkMeta;

    fn ctx(text: &str) -> SearchResult {
        SearchResult { text: text.into(), metadata: ChunkMeta { source: "a.txt".into() }, score: 0.5 }
    }

    #[test]
    fn prompt_layout() {
        let p = build_prompt("how?", &[ctx("one"), ctx("two")]);
        assert_eq!(
            p,
            "You are a helpful assistant. Use the provided context to answer.\nContext:\none\n\ntwo\n\nUser question: how?\nAnswer briefly and cite the most relevant sources by filename.\n"
        );
    }

    #[test]
    fn empty_context_keeps_template() {
        let p = build_prompt("q", &[]);
        assert!(p.contains("Context:\n\n\nUser question: q\n"));
    }
}
