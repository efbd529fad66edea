use crate::config::TranslateCredential;
use crate::service_account::TokenSource;
use anyhow::{Context, Result};
use async_trait::async_trait;
use log::debug;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Language every query is normalized to before retrieval
pub const PIVOT_LANGUAGE: &str = "en";

pub const DEFAULT_BASE_URL: &str = "https://translation.googleapis.com/language/translate/v2";

/// Classifies the ISO language code of a text
#[async_trait]
pub trait LanguageDetector: Send + Sync {
    async fn detect(&self, text: &str) -> Result<String>;
}

/// Converts text between two ISO language codes
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, text: &str, source: &str, target: &str) -> Result<String>;
}

/// Translate `text` into the pivot language unless it is already in it
pub async fn to_pivot(translator: &dyn Translator, text: &str, language: &str) -> Result<String> {
    if language == PIVOT_LANGUAGE {
        return Ok(text.to_string());
    }
    translator.translate(text, language, PIVOT_LANGUAGE).await
}

/// Translate pivot-language `text` back into `language`
pub async fn from_pivot(translator: &dyn Translator, text: &str, language: &str) -> Result<String> {
    if language == PIVOT_LANGUAGE {
        return Ok(text.to_string());
    }
    translator.translate(text, PIVOT_LANGUAGE, language).await
}

enum Auth {
    Bearer(TokenSource),
    ApiKey(String),
}

/// Google Cloud Translation (v2) client
pub struct GoogleTranslateClient {
    http: reqwest::Client,
    base_url: String,
    auth: Auth,
}

impl GoogleTranslateClient {
    pub fn new(credential: TranslateCredential) -> Result<Self> {
        let http = reqwest::Client::new();
        let auth = match credential {
            TranslateCredential::ServiceAccount(key) => {
                Auth::Bearer(TokenSource::new(key, http.clone())?)
            }
            TranslateCredential::ApiKey(key) => Auth::ApiKey(key),
        };

        Ok(GoogleTranslateClient {
            http,
            base_url: DEFAULT_BASE_URL.to_string(),
            auth,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    async fn post<B: Serialize + Sync, R: DeserializeOwned>(&self, url: &str, body: &B) -> Result<R> {
        let request = self.http.post(url).json(body);
        let request = match &self.auth {
            Auth::Bearer(tokens) => request.bearer_auth(tokens.access_token().await?),
            Auth::ApiKey(key) => request.header("x-goog-api-key", key),
        };

        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(anyhow::anyhow!(
                "Translation API request failed: {} {}",
                status,
                error_text
            ));
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl LanguageDetector for GoogleTranslateClient {
    async fn detect(&self, text: &str) -> Result<String> {
        let url = format!("{}/detect", self.base_url);
        let response: ApiResponse<DetectData> = self
            .post(&url, &DetectRequest { q: text })
            .await
            .context("Language detection failed")?;

        response
            .data
            .detections
            .into_iter()
            .flatten()
            .next()
            .map(|d| d.language)
            .ok_or_else(|| anyhow::anyhow!("No language detected"))
    }
}

#[async_trait]
impl Translator for GoogleTranslateClient {
    async fn translate(&self, text: &str, source: &str, target: &str) -> Result<String> {
        debug!("Translating {} chars from {} to {}", text.len(), source, target);

        let request = TranslateRequest {
            q: text,
            source,
            target,
            format: "text",
        };
        let response: ApiResponse<TranslateData> = self
            .post(&self.base_url, &request)
            .await
            .with_context(|| format!("Translation from {} to {} failed", source, target))?;

        response
            .data
            .translations
            .into_iter()
            .next()
            .map(|t| t.translated_text)
            .ok_or_else(|| anyhow::anyhow!("No translation returned"))
    }
}

#[derive(Serialize)]
struct DetectRequest<'a> {
    q: &'a str,
}

#[derive(Serialize)]
struct TranslateRequest<'a> {
    q: &'a str,
    source: &'a str,
    target: &'a str,
    format: &'static str,
}

#[derive(Deserialize)]
struct ApiResponse<T> {
    data: T,
}

#[derive(Deserialize)]
struct DetectData {
    detections: Vec<Vec<Detection>>,
}

#[derive(Deserialize)]
struct Detection {
    language: String,
}

#[derive(Deserialize)]
struct TranslateData {
    translations: Vec<Translation>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Translation {
    translated_text: String,
}
