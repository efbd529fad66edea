use crate::rag::RagChain;
use anyhow::Result;
use clap::ValueEnum;
use log::{error, info};
use std::io::{self, BufRead, Write};

/// Shown for every failure while answering, whatever its cause
pub const GENERIC_ERROR_MESSAGE: &str = "Unexpected error occurred. Try again later.";

/// Language of the interface labels. Does not affect how queries are answered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum UiLanguage {
    #[default]
    English,
    Tamil,
    Sinhala,
}

impl UiLanguage {
    pub const ALL: [UiLanguage; 3] = [UiLanguage::English, UiLanguage::Tamil, UiLanguage::Sinhala];

    /// Name as shown in the language selector
    pub fn label(self) -> &'static str {
        match self {
            UiLanguage::English => "English",
            UiLanguage::Tamil => "தமிழ்",
            UiLanguage::Sinhala => "සිංහල",
        }
    }

    pub fn placeholder(self) -> &'static str {
        match self {
            UiLanguage::English => "Ask your question",
            UiLanguage::Tamil => "உங்கள் கேள்வியைக் கேளுங்கள்",
            UiLanguage::Sinhala => "ඔබේ ප්‍රශ්නය අසන්න",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            UiLanguage::English => "Civil Registration Assistant - Srilanka",
            UiLanguage::Tamil => "சிவில் பதிவு உதவியாளர் - இலங்கை",
            UiLanguage::Sinhala => "සිවිල් ලියාපදිංචි සහකාර - ශ්‍රී ලංකාව",
        }
    }
}

pub const SIDEBAR: &str = "\
### ℹ️ About This Assistant
This tool provides information on registration of **births, marriages, and deaths in Sri Lanka**.

**Purpose:** Quick, AI-assisted access to procedures and requirements.

**Data Source:** [Registrar General's Department (RGD)](https://www.rgd.gov.lk)

**Disclaimer:** This is an unofficial assistant. For official information, contact RGD directly.

---
### 📞 RGD Contact Information
**Address:**
Registrar General’s Department
No. 234/A3, Denzil Kobbekaduwa Mawatha,
Battaramulla, Sri Lanka

**Phone:** +94 112 039 039
**Fax:** +94 112 039 036
**Email:** info@rgd.gov.lk
**Website:** [www.rgd.gov.lk](https://www.rgd.gov.lk)
";

/// One line naming every UI language, the current one in brackets
fn language_selector(current: UiLanguage) -> String {
    UiLanguage::ALL
        .iter()
        .map(|&language| {
            if language == current {
                format!("[{}]", language.label())
            } else {
                language.label().to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(" | ")
}

/// Outcome of one submitted question as the user sees it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Model output, Markdown formatted
    Answer(String),
    Failed,
}

impl Reply {
    pub fn text(&self) -> &str {
        match self {
            Reply::Answer(text) => text,
            Reply::Failed => GENERIC_ERROR_MESSAGE,
        }
    }
}

/// The user-facing boundary around a `RagChain`
pub struct Session {
    chain: RagChain,
    language: UiLanguage,
}

impl Session {
    pub fn new(chain: RagChain, language: UiLanguage) -> Self {
        Session { chain, language }
    }

    /// Answer one question. Never fails: errors are logged and collapsed into `Reply::Failed`.
    /// The question reaches the chain exactly as typed.
    pub async fn respond(&self, query: &str) -> Option<Reply> {
        if query.trim().is_empty() {
            return None;
        }

        match self.chain.run(query).await {
            Ok(answer) => Some(Reply::Answer(answer)),
            Err(e) => {
                error!("Error processing the query: {:#}", e);
                Some(Reply::Failed)
            }
        }
    }

    /// Title, language selector and sidebar shown before the first question
    pub fn header(&self) -> String {
        format!(
            "# {}\n\n{}\n\n{}",
            self.language.title(),
            language_selector(self.language),
            SIDEBAR
        )
    }

    /// Read questions from stdin until `exit` or end of input
    pub async fn run_loop(&self) -> Result<()> {
        println!("{}", self.header());
        info!(
            "Ready to answer questions from index '{}'. Type 'exit' to quit.",
            self.chain.index()
        );

        let stdin = io::stdin();
        let mut stdout = io::stdout();
        let mut buffer = String::new();

        loop {
            print!("\n{}: ", self.language.placeholder());
            stdout.flush()?;

            buffer.clear();
            if stdin.lock().read_line(&mut buffer)? == 0 {
                break;
            }

            let question = buffer.trim_end_matches(&['\r', '\n'][..]);
            if question.trim().eq_ignore_ascii_case("exit") {
                info!("Goodbye!");
                break;
            }

            match self.respond(question).await {
                Some(Reply::Answer(answer)) => println!("\n{}", answer),
                Some(Reply::Failed) => eprintln!("\n{}", GENERIC_ERROR_MESSAGE),
                None => continue,
            }
        }

        Ok(())
    }
}
