use anyhow::{Context, Result};
use clap::Parser;
use dotenv::dotenv;
use log::info;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use rgd_assistant::bootstrap::{ensure_index, ReadinessPolicy};
use rgd_assistant::config::{EnvSource, SecretsFile, Settings};
use rgd_assistant::database::QdrantClient;
use rgd_assistant::document::ensure_folder;
use rgd_assistant::gemini::GeminiClient;
use rgd_assistant::rag::{RagChain, Services};
use rgd_assistant::translate::GoogleTranslateClient;
use rgd_assistant::ui::{Session, UiLanguage};

/// Question-answering assistant for civil registration in Sri Lanka
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Folder of reference documents ingested when the index is first created
    #[arg(long, default_value = "rgd_data")]
    data_dir: PathBuf,

    /// Vector index name
    #[arg(long, default_value = "rgd-data")]
    index: String,

    /// Read credentials from a TOML secrets file instead of the environment
    #[arg(long)]
    secrets: Option<PathBuf>,

    /// Language of the interface labels
    #[arg(long, value_enum, default_value_t = UiLanguage::English)]
    lang: UiLanguage,

    /// Answer a single question and exit
    #[arg(long)]
    question: Option<String>,

    /// Give up waiting for a newly created index after this many seconds
    #[arg(long, default_value_t = 120)]
    ready_timeout_secs: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize environment
    dotenv().ok();
    env_logger::init();

    let args = Args::parse();

    // Credentials are checked before any client is built or question read
    let settings = match &args.secrets {
        Some(path) => Settings::load(&SecretsFile::from_path(path)?)?,
        None => Settings::load(&EnvSource)?,
    };

    let qdrant = Arc::new(
        QdrantClient::new(settings.qdrant.clone()).context("Failed to initialize Qdrant client")?,
    );
    let gemini = Arc::new(GeminiClient::new(settings.gemini.clone()));
    let translate = Arc::new(
        GoogleTranslateClient::new(settings.translate.clone())
            .context("Failed to initialize Google Translate client")?,
    );

    let data_dir = ensure_folder(&args.data_dir)?;
    let policy = ReadinessPolicy {
        timeout: Duration::from_secs(args.ready_timeout_secs),
        ..ReadinessPolicy::default()
    };
    let outcome = ensure_index(qdrant.as_ref(), gemini.as_ref(), &args.index, &data_dir, policy)
        .await
        .context("Failed to prepare vector index")?;
    info!("Vector index '{}': {:?}", args.index, outcome);

    let services = Services {
        detector: translate.clone(),
        translator: translate,
        embedder: gemini.clone(),
        store: qdrant,
        generator: gemini,
    };
    let chain = RagChain::new(services, args.index).with_localization(settings.answer_localization);
    let session = Session::new(chain, args.lang);

    match args.question {
        Some(question) => {
            if let Some(reply) = session.respond(&question).await {
                println!("{}", reply.text());
            }
        }
        None => session
            .run_loop()
            .await
            .context("Error in query loop")?,
    }

    Ok(())
}
