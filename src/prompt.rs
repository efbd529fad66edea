use crate::document::DocumentChunk;
use anyhow::Result;
use async_trait::async_trait;

/// Maximum number of chunks handed to the model as context
pub const RETRIEVAL_TOP_K: u64 = 3;

/// Fixed reply for questions outside civil registration
pub const REFUSAL_MESSAGE: &str = "I'm sorry, I can’t help with that.";

/// Fill the instruction template with retrieved context and the user's question
pub fn render_prompt(context: &str, question: &str) -> String {
    format!(
        r#"You are a helpful and knowledgeable AI assistant that provides accurate and clear information about the registration of births, marriages, and deaths in Sri Lanka. You support responses in English (en), Sinhala (si), or Tamil (ta) based on the user's query language.

Use only the information from the retrieved documents to answer. Follow these instructions:

- Only answer questions related to registration information.
If the user's question is unrelated or the answer cannot be found in the retrieved documents, respond politely with:
"{refusal}"

- Present the response in a clear, organized format using bullet points or numbered lists where appropriate.

- If relevant, include links from the 'Important Links' section (If exists) to guide users to official resources.

- At the end of the response, include a "For more information" link if available and relevant to the query.

Maintain a professional and helpful tone. Do not invent or assume information. Answer in the language used by the user in their query.
---
Context:
{context}

user: {question}
Assistant:
"#,
        refusal = REFUSAL_MESSAGE,
    )
}

/// Append the answer-language directive to a pivot-language query
pub fn with_language_directive(query: &str, language: &str) -> String {
    format!("{}. Please provide your answer in {}", query, language)
}

/// Up to `RETRIEVAL_TOP_K` chunks, most similar first
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RetrievedContext {
    chunks: Vec<DocumentChunk>,
}

impl RetrievedContext {
    pub fn new(mut chunks: Vec<DocumentChunk>) -> Self {
        chunks.truncate(RETRIEVAL_TOP_K as usize);
        RetrievedContext { chunks }
    }

    pub fn chunks(&self) -> &[DocumentChunk] {
        &self.chunks
    }

    /// Chunk texts joined with blank lines, in retrieval order
    pub fn render(&self) -> String {
        self.chunks
            .iter()
            .map(|chunk| chunk.text.as_str())
            .collect::<Vec<&str>>()
            .join("\n\n")
    }
}

/// Produces an answer from retrieved context and a question
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    async fn generate(&self, context: &str, question: &str) -> Result<String>;
}
