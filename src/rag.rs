use crate::database::VectorStore;
use crate::embeddings::Embedder;
use crate::prompt::{with_language_directive, AnswerGenerator, RetrievedContext, RETRIEVAL_TOP_K};
use crate::translate::{from_pivot, to_pivot, LanguageDetector, Translator};
use anyhow::{Context, Result};
use log::{debug, info};
use std::str::FromStr;
use std::sync::Arc;

/// How the answer ends up in the user's language
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AnswerLocalization {
    /// Ask the model to answer in the detected language. No second translation.
    #[default]
    PromptDirective,
    /// Also translate the model's answer from the pivot language back to the detected one
    BackTranslate,
}

impl FromStr for AnswerLocalization {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "prompt" | "directive" => Ok(AnswerLocalization::PromptDirective),
            "translate" | "back-translate" => Ok(AnswerLocalization::BackTranslate),
            other => Err(format!("unknown answer localization '{}'", other)),
        }
    }
}

/// Client handles shared by every query, built once at startup
#[derive(Clone)]
pub struct Services {
    pub detector: Arc<dyn LanguageDetector>,
    pub translator: Arc<dyn Translator>,
    pub embedder: Arc<dyn Embedder>,
    pub store: Arc<dyn VectorStore>,
    pub generator: Arc<dyn AnswerGenerator>,
}

/// A user question with its detected language
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub text: String,
    pub language: String,
}

/// A generated answer and the language the user asked in
#[derive(Debug, Clone, PartialEq)]
pub struct Answer {
    pub text: String,
    pub language: String,
}

/// Detect, normalize, retrieve and generate for one question
pub struct RagChain {
    services: Services,
    index: String,
    localization: AnswerLocalization,
}

impl RagChain {
    pub fn new(services: Services, index: impl Into<String>) -> Self {
        RagChain {
            services,
            index: index.into(),
            localization: AnswerLocalization::default(),
        }
    }

    pub fn with_localization(mut self, localization: AnswerLocalization) -> Self {
        self.localization = localization;
        self
    }

    pub fn index(&self) -> &str {
        &self.index
    }

    /// Answer `query_text`, returning the model's text
    pub async fn run(&self, query_text: &str) -> Result<String> {
        Ok(self.answer(query_text).await?.text)
    }

    pub async fn answer(&self, query_text: &str) -> Result<Answer> {
        let query = self.detect(query_text).await?;

        let pivot_query = to_pivot(self.services.translator.as_ref(), &query.text, &query.language)
            .await
            .context("Failed to translate query")?;
        debug!("Pivot query: {}", pivot_query);

        let context = self.retrieve(&pivot_query).await?;
        debug!("Retrieved {} chunks", context.chunks().len());

        let question = with_language_directive(&pivot_query, &query.language);
        let generated = self
            .services
            .generator
            .generate(&context.render(), &question)
            .await
            .context("Failed to generate answer")?;

        let text = match self.localization {
            AnswerLocalization::PromptDirective => generated,
            AnswerLocalization::BackTranslate => {
                from_pivot(self.services.translator.as_ref(), &generated, &query.language)
                    .await
                    .context("Failed to translate answer")?
            }
        };

        Ok(Answer {
            text,
            language: query.language,
        })
    }

    async fn detect(&self, text: &str) -> Result<Query> {
        let language = self
            .services
            .detector
            .detect(text)
            .await
            .context("Failed to detect query language")?;
        info!("Detected query language: {}", language);

        Ok(Query {
            text: text.to_string(),
            language,
        })
    }

    /// Embed the pivot-language query and fetch the closest chunks
    pub async fn retrieve(&self, pivot_query: &str) -> Result<RetrievedContext> {
        let embedding = self
            .services
            .embedder
            .embed(pivot_query)
            .await
            .context("Failed to embed query")?;

        let chunks = self
            .services
            .store
            .search(&self.index, &embedding, RETRIEVAL_TOP_K)
            .await
            .context("Failed to retrieve context")?;

        Ok(RetrievedContext::new(chunks))
    }
}
