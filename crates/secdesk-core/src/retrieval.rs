//! Placeholder retrieval layer
//!
//! Stands in for a real vector store. `query_knowledge_base` returns canned
//! reference snippets so prompt assembly can be exercised end to end; the
//! formatting half is real and stays once retrieval is.

const GRC_SNIPPETS: &[&str] = &[
    "NIST CSF control PR.AC-1 requires identities and credentials to be issued, managed, and audited for authorized devices and users.",
    "Internal GRC policy 2023.4 sets the composite risk scoring threshold used in vendor onboarding reviews.",
];

/// Return up to `top_k` reference snippets for a namespace. The query is
/// accepted for signature stability but not yet consulted.
pub fn query_knowledge_base(_query: &str, namespace: &str, top_k: usize) -> Vec<String> {
    let snippets: &[&str] = match namespace {
        "grc" => GRC_SNIPPETS,
        _ => &[],
    };
    snippets.iter().take(top_k).map(|s| s.to_string()).collect()
}

/// Assemble a retrieval-augmented prompt: persona header, retrieved
/// documents, then the question.
pub fn format_rag_prompt(query: &str, docs: &[String], persona: &str) -> String {
    let context = docs.join("\n\n");
    format!(
        "{persona}\n\nUse the following documents to answer the query:\n{context}\n\nQuestion: {query}\n\nAnswer:"
    )
}
