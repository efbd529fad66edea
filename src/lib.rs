pub mod bootstrap;
pub mod config;
pub mod database;
pub mod document;
pub mod embeddings;
pub mod error;
pub mod gemini;
pub mod prompt;
pub mod rag;
pub mod service_account;
pub mod translate;
pub mod ui;

#[cfg(test)]
mod testing;
