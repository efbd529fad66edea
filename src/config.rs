use crate::database::QdrantConfig;
use crate::error::ConfigError;
use crate::gemini::{GeminiConfig, DEFAULT_BASE_URL};
use crate::rag::AnswerLocalization;
use crate::service_account::ServiceAccountKey;
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub const GOOGLE_API_KEY: &str = "GOOGLE_API_KEY";
pub const QDRANT_URL: &str = "QDRANT_URL";
pub const QDRANT_API_KEY: &str = "QDRANT_API_KEY";
pub const TRANSLATE_CONFIG_PATH: &str = "GOOGLE_TRANSLATE_CONFIG_PATH";
pub const TRANSLATE_CONFIG: &str = "GOOGLE_TRANSLATE_CONFIG";
pub const TRANSLATE_API_KEY: &str = "GOOGLE_TRANSLATE_API_KEY";
pub const GEMINI_BASE_URL: &str = "GEMINI_BASE_URL";
pub const ANSWER_LOCALIZATION: &str = "ANSWER_LOCALIZATION";

/// Where settings are read from
pub trait ConfigSource {
    fn get(&self, key: &str) -> Option<String>;

    /// Human readable origin, used in error messages
    fn describe(&self) -> String;
}

/// Process environment. `main` loads `.env` into it beforehand.
pub struct EnvSource;

impl ConfigSource for EnvSource {
    fn get(&self, key: &str) -> Option<String> {
        env::var(key).ok()
    }

    fn describe(&self) -> String {
        "environment".to_string()
    }
}

/// A TOML secrets file with top-level keys. Tables are handed out as JSON.
pub struct SecretsFile {
    path: PathBuf,
    table: toml::Table,
}

impl SecretsFile {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref().to_path_buf();
        let raw = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        let table = raw
            .parse::<toml::Table>()
            .map_err(|source| ConfigError::Secrets {
                path: path.clone(),
                source,
            })?;

        Ok(SecretsFile { path, table })
    }
}

impl ConfigSource for SecretsFile {
    fn get(&self, key: &str) -> Option<String> {
        match self.table.get(key)? {
            toml::Value::String(value) => Some(value.clone()),
            toml::Value::Table(table) => serde_json::to_string(table).ok(),
            other => Some(other.to_string()),
        }
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

impl ConfigSource for HashMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        HashMap::get(self, key).cloned()
    }

    fn describe(&self) -> String {
        "in-memory settings".to_string()
    }
}

/// How the translation service authenticates
#[derive(Debug, Clone)]
pub enum TranslateCredential {
    ServiceAccount(ServiceAccountKey),
    ApiKey(String),
}

/// Everything needed to construct the service clients
#[derive(Debug, Clone)]
pub struct Settings {
    pub gemini: GeminiConfig,
    pub qdrant: QdrantConfig,
    pub translate: TranslateCredential,
    pub answer_localization: AnswerLocalization,
}

impl Settings {
    /// Read and validate settings. Fails on the first missing required key.
    pub fn load(source: &dyn ConfigSource) -> Result<Self, ConfigError> {
        let google_api_key = require(source, GOOGLE_API_KEY)?;
        let qdrant_url = require(source, QDRANT_URL)?;
        let translate = translate_credential(source)?;

        let gemini = GeminiConfig::new(google_api_key).with_base_url(
            optional(source, GEMINI_BASE_URL).unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        );
        let qdrant = QdrantConfig {
            url: qdrant_url,
            api_key: optional(source, QDRANT_API_KEY),
        };

        let answer_localization = match optional(source, ANSWER_LOCALIZATION) {
            None => AnswerLocalization::default(),
            Some(value) => value
                .parse()
                .map_err(|_| ConfigError::InvalidValue {
                    key: ANSWER_LOCALIZATION,
                    value,
                })?,
        };

        Ok(Settings {
            gemini,
            qdrant,
            translate,
            answer_localization,
        })
    }
}

fn optional(source: &dyn ConfigSource, key: &str) -> Option<String> {
    source
        .get(key)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn require(source: &dyn ConfigSource, key: &'static str) -> Result<String, ConfigError> {
    optional(source, key).ok_or(ConfigError::Missing(key))
}

/// Inline credential wins over a path, and either wins over a plain API key
fn translate_credential(source: &dyn ConfigSource) -> Result<TranslateCredential, ConfigError> {
    if let Some(inline) = optional(source, TRANSLATE_CONFIG) {
        return parse_service_account(&inline, format!("{} in {}", TRANSLATE_CONFIG, source.describe()));
    }

    if let Some(path) = optional(source, TRANSLATE_CONFIG_PATH) {
        let path = PathBuf::from(path);
        let raw = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        return parse_service_account(&raw, path.display().to_string());
    }

    if let Some(key) = optional(source, TRANSLATE_API_KEY) {
        return Ok(TranslateCredential::ApiKey(key));
    }

    Err(ConfigError::Missing(TRANSLATE_CONFIG_PATH))
}

fn parse_service_account(raw: &str, origin: String) -> Result<TranslateCredential, ConfigError> {
    ServiceAccountKey::from_json(raw)
        .map(TranslateCredential::ServiceAccount)
        .map_err(|err| ConfigError::InvalidCredential {
            origin,
            reason: err.to_string(),
        })
}
