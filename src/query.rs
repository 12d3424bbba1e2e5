use anyhow::{anyhow, Context, Result};
use langchain_rust::{
    language_models::llm::LLM,
    llm::{openai::OpenAI, OpenAIConfig},
    schemas::Document,
    vectorstore::{VecStoreOptions, VectorStore},
};
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Chunks retrieved per question.
pub const TOP_K: usize = 4;
pub const CONTEXT_DELIMITER: &str = "\n---\n";
/// Substituted when the similarity search returns nothing, so the model is
/// told there is no context instead of being handed an empty block.
pub const NO_CONTEXT_PLACEHOLDER: &str = "No relevant context.";

const SYSTEM_PROMPT: &str = "You are a financial analyst assistant answering questions about one \
company's quarterly profit-and-loss statements. Answer only from the context \
provided below; when the context does not contain the answer, say so plainly \
instead of guessing. Figures are in the reporting currency and unit noted in \
the context. Be concise and quote the relevant quarter when citing numbers.";

/// One prior turn of the conversation. Accepted for interface stability;
/// retrieval and scoring do not use it yet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: String,
    pub content: String,
}

#[derive(Debug)]
pub struct ChatAnswer {
    pub answer: String,
    /// Source text-file identifiers of the retrieved chunks, in rank order.
    pub sources: Vec<String>,
}

/// Compose the single prompt sent to the model: system instruction, the
/// retrieved context (or the placeholder), and the user's question.
pub fn build_prompt(docs: &[Document], question: &str) -> String {
    let joined = docs
        .iter()
        .map(|d| d.page_content.as_str())
        .collect::<Vec<_>>()
        .join(CONTEXT_DELIMITER);
    let context = if joined.is_empty() {
        NO_CONTEXT_PLACEHOLDER.to_string()
    } else {
        joined
    };
    format!(
        "{}\n\nContext:\n{}\n\nUser: {}",
        SYSTEM_PROMPT, context, question
    )
}

/// Answer a question against one company's indexed reports.
///
/// Retrieves the top-k chunks for the company slug, builds the prompt and
/// invokes the model once. Search and generation failures propagate to the
/// caller; no degraded answer is returned.
pub async fn answer_question(
    store: &dyn VectorStore,
    llm: &OpenAI<OpenAIConfig>,
    company_slug: &str,
    question: &str,
    _history: &[ChatTurn],
) -> Result<ChatAnswer> {
    let options =
        VecStoreOptions::default().with_filters(json!({ "company_slug": company_slug }));
    let docs = store
        .similarity_search(question, TOP_K, &options)
        .await
        .map_err(|e| anyhow!("vector search failed for {}: {}", company_slug, e))?;
    log::info!(
        "vector search returned {} chunks for {}",
        docs.len(),
        company_slug
    );

    let prompt = build_prompt(&docs, question);
    let answer = llm
        .invoke(&prompt)
        .await
        .context("LLM generation failed")?;

    let sources = docs
        .iter()
        .map(|d| {
            d.metadata
                .get("source_txt")
                .and_then(|v| v.as_str())
                .unwrap_or("unknown")
                .to_string()
        })
        .collect();

    Ok(ChatAnswer { answer, sources })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn doc(content: &str) -> Document {
        Document {
            page_content: content.to_string(),
            metadata: HashMap::new(),
            score: 0.0,
        }
    }

    #[test]
    fn empty_retrieval_uses_the_placeholder() {
        let prompt = build_prompt(&[], "what was Q3 revenue?");
        assert!(prompt.contains(NO_CONTEXT_PLACEHOLDER));
        assert!(prompt.ends_with("User: what was Q3 revenue?"));
    }

    #[test]
    fn retrieved_chunks_are_joined_with_the_delimiter() {
        let docs = vec![doc("chunk one"), doc("chunk two")];
        let prompt = build_prompt(&docs, "q");
        assert!(prompt.contains("chunk one\n---\nchunk two"));
        assert!(!prompt.contains(NO_CONTEXT_PLACEHOLDER));
    }
}
