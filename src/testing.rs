//! In-memory stand-ins for the external services, recording every call.

use crate::database::{IndexSpec, VectorStore};
use crate::document::DocumentChunk;
use crate::embeddings::{EmbeddedChunk, Embedder, Embedding, EMBEDDING_DIMENSION};
use crate::prompt::AnswerGenerator;
use crate::service_account::ServiceAccountKey;
use crate::translate::{LanguageDetector, Translator};
use anyhow::Result;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

pub struct FakeDetector {
    language: Option<String>,
}

impl FakeDetector {
    pub fn returning(language: &str) -> Self {
        FakeDetector {
            language: Some(language.to_string()),
        }
    }

    pub fn failing() -> Self {
        FakeDetector { language: None }
    }
}

#[async_trait]
impl LanguageDetector for FakeDetector {
    async fn detect(&self, _text: &str) -> Result<String> {
        self.language
            .clone()
            .ok_or_else(|| anyhow::anyhow!("detector unavailable"))
    }
}

/// Prefixes translated text with `[source->target]`
#[derive(Default)]
pub struct FakeTranslator {
    calls: Mutex<Vec<(String, String, String)>>,
    fail: bool,
}

impl FakeTranslator {
    pub fn failing() -> Self {
        FakeTranslator {
            fail: true,
            ..Default::default()
        }
    }

    /// (text, source, target) per call
    pub fn calls(&self) -> Vec<(String, String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Translator for FakeTranslator {
    async fn translate(&self, text: &str, source: &str, target: &str) -> Result<String> {
        self.calls.lock().unwrap().push((
            text.to_string(),
            source.to_string(),
            target.to_string(),
        ));
        if self.fail {
            anyhow::bail!("translation quota exceeded");
        }
        Ok(format!("[{}->{}] {}", source, target, text))
    }
}

#[derive(Default)]
pub struct FakeEmbedder {
    inputs: Mutex<Vec<String>>,
    fail: bool,
}

impl FakeEmbedder {
    pub fn failing() -> Self {
        FakeEmbedder {
            fail: true,
            ..Default::default()
        }
    }

    pub fn inputs(&self) -> Vec<String> {
        self.inputs.lock().unwrap().clone()
    }
}

#[async_trait]
impl Embedder for FakeEmbedder {
    async fn embed(&self, text: &str) -> Result<Embedding> {
        self.inputs.lock().unwrap().push(text.to_string());
        if self.fail {
            anyhow::bail!("embedding model not loaded");
        }
        Ok(Embedding {
            values: vec![0.1; EMBEDDING_DIMENSION],
        })
    }
}

pub struct FakeStore {
    exists: bool,
    /// `is_ready` answers true from this poll onwards; `None` never
    ready_on_poll: Option<usize>,
    polls: AtomicUsize,
    documents: Vec<DocumentChunk>,
    created: Mutex<Vec<IndexSpec>>,
    upserted: Mutex<Vec<EmbeddedChunk>>,
    search_limits: Mutex<Vec<u64>>,
    fail_search: bool,
}

impl FakeStore {
    /// An existing index holding `count` documents
    pub fn with_documents(count: usize) -> Self {
        FakeStore {
            exists: true,
            ready_on_poll: Some(1),
            polls: AtomicUsize::new(0),
            documents: (0..count)
                .map(|i| DocumentChunk::new(format!("rgd_data/{}.md", i), format!("document {}", i)))
                .collect(),
            created: Mutex::new(Vec::new()),
            upserted: Mutex::new(Vec::new()),
            search_limits: Mutex::new(Vec::new()),
            fail_search: false,
        }
    }

    /// No index yet; ready on the first poll after creation
    pub fn missing() -> Self {
        FakeStore {
            exists: false,
            ..FakeStore::with_documents(0)
        }
    }

    pub fn ready_on_poll(mut self, poll: usize) -> Self {
        self.ready_on_poll = Some(poll);
        self
    }

    pub fn never_ready(mut self) -> Self {
        self.ready_on_poll = None;
        self
    }

    pub fn failing_search(mut self) -> Self {
        self.fail_search = true;
        self
    }

    pub fn created(&self) -> Vec<IndexSpec> {
        self.created.lock().unwrap().clone()
    }

    pub fn upserted_sources(&self) -> Vec<String> {
        self.upserted
            .lock()
            .unwrap()
            .iter()
            .map(|e| e.chunk.source.clone())
            .collect()
    }

    pub fn polls(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }

    pub fn search_limits(&self) -> Vec<u64> {
        self.search_limits.lock().unwrap().clone()
    }
}

#[async_trait]
impl VectorStore for FakeStore {
    async fn index_exists(&self, _index: &str) -> Result<bool> {
        Ok(self.exists)
    }

    async fn create_index(&self, spec: &IndexSpec) -> Result<()> {
        self.created.lock().unwrap().push(spec.clone());
        Ok(())
    }

    async fn is_ready(&self, _index: &str) -> Result<bool> {
        let poll = self.polls.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(self.ready_on_poll.map_or(false, |ready| poll >= ready))
    }

    async fn upsert(&self, _index: &str, chunks: Vec<EmbeddedChunk>) -> Result<()> {
        self.upserted.lock().unwrap().extend(chunks);
        Ok(())
    }

    async fn search(
        &self,
        _index: &str,
        _query: &Embedding,
        limit: u64,
    ) -> Result<Vec<DocumentChunk>> {
        self.search_limits.lock().unwrap().push(limit);
        if self.fail_search {
            anyhow::bail!("vector index unreachable");
        }
        Ok(self
            .documents
            .iter()
            .take(limit as usize)
            .cloned()
            .collect())
    }
}

pub struct FakeGenerator {
    answer: Option<String>,
    calls: Mutex<Vec<(String, String)>>,
}

impl FakeGenerator {
    pub fn answering(answer: &str) -> Self {
        FakeGenerator {
            answer: Some(answer.to_string()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        FakeGenerator {
            answer: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// (context, question) of the most recent call
    pub fn last_call(&self) -> Option<(String, String)> {
        self.calls.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl AnswerGenerator for FakeGenerator {
    async fn generate(&self, context: &str, question: &str) -> Result<String> {
        self.calls
            .lock()
            .unwrap()
            .push((context.to_string(), question.to_string()));
        self.answer
            .clone()
            .ok_or_else(|| anyhow::anyhow!("model returned 500"))
    }
}

/// RSA key generated for tests only
const TEST_PRIVATE_KEY: &str = include_str!("../testdata/service_account_key.pem");

/// A loadable service-account key that exchanges tokens at `token_uri`
pub fn service_account_key(token_uri: String) -> ServiceAccountKey {
    ServiceAccountKey {
        client_email: "translator@rgd-assistant.iam.gserviceaccount.com".to_string(),
        private_key: TEST_PRIVATE_KEY.to_string(),
        token_uri,
        private_key_id: Some("abc123".to_string()),
    }
}
