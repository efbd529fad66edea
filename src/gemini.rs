use crate::embeddings::{Embedder, Embedding, EMBEDDING_DIMENSION};
use crate::prompt::{render_prompt, AnswerGenerator};
use anyhow::Result;
use async_trait::async_trait;
use log::debug;
use serde::{Deserialize, Serialize};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const GENERATION_MODEL: &str = "models/gemini-2.0-flash";
pub const EMBEDDING_MODEL: &str = "models/text-embedding-004";
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Configuration for Gemini API
#[derive(Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub base_url: String,
}

impl GeminiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        GeminiConfig {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// The key travels in a header, never in the URL
    fn endpoint(&self, model: &str, method: &str) -> String {
        format!("{}/{}:{}", self.base_url, model, method)
    }
}

impl std::fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("api_key", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Client for interacting with Gemini API
#[derive(Clone)]
pub struct GeminiClient {
    config: GeminiConfig,
    client: reqwest::Client,
}

impl GeminiClient {
    /// Create a new Gemini client
    pub fn new(config: GeminiConfig) -> Self {
        let client = reqwest::Client::new();
        GeminiClient { config, client }
    }

    /// Generate a 384-dimensional embedding for a text
    pub async fn get_embedding(&self, text: &str) -> Result<Embedding> {
        let request = EmbeddingRequest {
            model: EMBEDDING_MODEL,
            content: EmbeddingContent {
                parts: vec![Part { text }],
            },
            output_dimensionality: EMBEDDING_DIMENSION,
        };

        let url = self.config.endpoint(EMBEDDING_MODEL, "embedContent");

        let response = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, &self.config.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(anyhow::anyhow!(
                "Embedding request failed: {} {}",
                status,
                error_text
            ));
        }

        let response_data: EmbeddingResponse = response.json().await?;

        Ok(Embedding::checked(response_data.embedding.values)?)
    }

    /// Generate text using a Gemini model
    pub async fn generate_text(
        &self,
        prompt: &str,
        model: &'static str,
        temperature: f32,
        top_p: f32,
        top_k: i32,
        max_output_tokens: i32,
    ) -> Result<String> {
        let request = GenerateRequest {
            model,
            contents: vec![Content::new_with_role(prompt, "user")],
            generation_config: GenerationConfig {
                temperature,
                top_p,
                top_k,
                max_output_tokens,
            },
        };

        let url = self.config.endpoint(model, "generateContent");

        let response = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, &self.config.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(anyhow::anyhow!(
                "Generation request failed: {} {}",
                status,
                error_text
            ));
        }

        let response_data: GenerateResponse = response.json().await?;
        debug!("{} returned {} candidates", model, response_data.candidates.len());

        // The model may split its answer across several parts
        response_data
            .candidates
            .into_iter()
            .next()
            .map(|c| {
                c.content
                    .parts
                    .into_iter()
                    .map(|p| p.text)
                    .collect::<String>()
            })
            .filter(|text| !text.is_empty())
            .ok_or_else(|| anyhow::anyhow!("No response generated"))
    }

    /// Answer a question from retrieved context using the registration assistant prompt
    pub async fn generate_answer(&self, context: &str, question: &str) -> Result<String> {
        let prompt = render_prompt(context, question);

        self.generate_text(&prompt, GENERATION_MODEL, 0.2, 0.8, 40, 1024)
            .await
    }
}

#[async_trait]
impl Embedder for GeminiClient {
    async fn embed(&self, text: &str) -> Result<Embedding> {
        self.get_embedding(text).await
    }
}

#[async_trait]
impl AnswerGenerator for GeminiClient {
    async fn generate(&self, context: &str, question: &str) -> Result<String> {
        self.generate_answer(context, question).await
    }
}

// Request/response structures for the Gemini API

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbeddingRequest<'a> {
    model: &'static str,
    content: EmbeddingContent<'a>,
    output_dimensionality: usize,
}

#[derive(Serialize)]
struct EmbeddingContent<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Deserialize, Debug)]
struct EmbeddingResponse {
    embedding: EmbeddingData,
}

#[derive(Deserialize, Debug)]
struct EmbeddingData {
    values: Vec<f32>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    model: &'static str,
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
    role: &'static str,
}

impl<'a> Content<'a> {
    fn new_with_role(text: &'a str, role: &'static str) -> Self {
        Content {
            parts: vec![Part { text }],
            role,
        }
    }
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_p: f32,
    top_k: i32,
    max_output_tokens: i32,
}

#[derive(Deserialize, Debug)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize, Debug)]
struct Candidate {
    content: ResponseContent,
}

#[derive(Deserialize, Debug)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize, Debug)]
struct ResponsePart {
    #[serde(default)]
    text: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> GeminiClient {
        GeminiClient::new(GeminiConfig::new("test-key").with_base_url(server.uri()))
    }

    #[tokio::test]
    async fn embedding_requests_384_dimensions() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/text-embedding-004:embedContent"))
            .and(header("x-goog-api-key", "test-key"))
            .and(body_partial_json(serde_json::json!({
                "model": "models/text-embedding-004",
                "outputDimensionality": 384
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "embedding": { "values": vec![0.25f32; 384] }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let embedding = client_for(&server).embed("birth certificate").await.unwrap();

        assert_eq!(embedding.values.len(), EMBEDDING_DIMENSION);
    }

    #[tokio::test]
    async fn embedding_with_wrong_dimension_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/text-embedding-004:embedContent"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "embedding": { "values": vec![0.25f32; 768] }
            })))
            .mount(&server)
            .await;

        let err = client_for(&server).embed("text").await.unwrap_err();

        assert!(err.to_string().contains("dimension mismatch"), "{err}");
    }

    #[tokio::test]
    async fn answer_uses_registration_prompt() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/gemini-2.0-flash:generateContent"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{
                    "content": {
                        "role": "model",
                        "parts": [{"text": "- Visit the "}, {"text": "Divisional Secretariat"}]
                    }
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let answer = client_for(&server)
            .generate("context text", "Where do I go?. Please provide your answer in en")
            .await
            .unwrap();
        assert_eq!(answer, "- Visit the Divisional Secretariat");

        let requests = server.received_requests().await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
        let prompt = body["contents"][0]["parts"][0]["text"].as_str().unwrap();
        assert!(prompt.contains("Context:\ncontext text"));
        assert!(prompt.contains("user: Where do I go?. Please provide your answer in en"));
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 1024);
    }

    #[tokio::test]
    async fn non_success_status_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let err = client_for(&server).generate("c", "q").await.unwrap_err();

        assert!(err.to_string().contains("503"), "{err}");
        assert!(err.to_string().contains("overloaded"), "{err}");
    }

    #[tokio::test]
    async fn transport_errors_do_not_expose_the_api_key() {
        let client = GeminiClient::new(
            GeminiConfig::new("SECRET-GEMINI-KEY").with_base_url("http://127.0.0.1:1"),
        );

        let embed_err = format!("{:#}", client.embed("text").await.unwrap_err());
        let generate_err = format!("{:#}", client.generate("c", "q").await.unwrap_err());

        assert!(!embed_err.contains("SECRET-GEMINI-KEY"), "{embed_err}");
        assert!(!generate_err.contains("SECRET-GEMINI-KEY"), "{generate_err}");
    }

    #[tokio::test]
    async fn empty_candidates_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": []
            })))
            .mount(&server)
            .await;

        let err = client_for(&server).generate("c", "q").await.unwrap_err();

        assert_eq!(err.to_string(), "No response generated");
    }
}
