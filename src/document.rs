use anyhow::{Context, Result};
use log::{debug, info, warn};
use mime_guess::from_path;
use pdf_extract::extract_text;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// One ingested reference document. Files are stored whole, never split.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentChunk {
    /// Source file path, also the chunk's identity in the vector index
    pub source: String,
    /// The full text content of the file
    pub text: String,
}

impl DocumentChunk {
    pub fn new(source: impl Into<String>, text: impl Into<String>) -> Self {
        DocumentChunk {
            source: source.into(),
            text: text.into(),
        }
    }

    /// Load a document from a file path (text, Markdown or PDF)
    pub fn from_file<P: AsRef<Path>>(file_path: P) -> Result<Self> {
        let path = file_path.as_ref();

        let mime_type = from_path(path).first_or_octet_stream().to_string();
        debug!("Detected MIME type: {}", mime_type);

        let text = read_document_content(path, &mime_type)?;

        Ok(DocumentChunk {
            source: path.display().to_string(),
            text,
        })
    }
}

/// Create the data folder if it does not exist yet and return it
pub fn ensure_folder<P: AsRef<Path>>(folder: P) -> Result<PathBuf> {
    let folder = folder.as_ref();
    if !folder.exists() {
        fs::create_dir_all(folder)
            .with_context(|| format!("Failed to create folder {}", folder.display()))?;
    }
    Ok(folder.to_path_buf())
}

/// Recursively list supported documents under `folder`, sorted by path
pub fn discover_documents<P: AsRef<Path>>(folder: P) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in WalkDir::new(folder.as_ref()) {
        let entry = entry
            .with_context(|| format!("Failed to walk {}", folder.as_ref().display()))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let mime_type = from_path(entry.path()).first_or_octet_stream().to_string();
        if is_supported(&mime_type) {
            files.push(entry.into_path());
        } else {
            debug!("Skipping unsupported file: {}", entry.path().display());
        }
    }

    files.sort();
    Ok(files)
}

fn is_supported(mime_type: &str) -> bool {
    mime_type.starts_with("text/") || mime_type.starts_with("application/pdf")
}

/// Read content from a document based on its MIME type
pub fn read_document_content<P: AsRef<Path>>(file_path: P, mime_type: &str) -> Result<String> {
    let path = file_path.as_ref();

    match mime_type {
        mime if mime.starts_with("application/pdf") => {
            info!("Processing PDF document: {}", path.display());
            let content = extract_text(path)
                .with_context(|| format!("Failed to extract text from PDF: {}", path.display()))?;

            // PDF extraction tends to leave runs of blank lines and spaces
            let cleaned_content = normalize_whitespace(&content);

            if cleaned_content.is_empty() {
                warn!("Extracted PDF content is empty or contains only whitespace");
            }

            Ok(cleaned_content)
        }

        mime if mime.starts_with("text/") => {
            info!("Processing text document: {}", path.display());
            fs::read_to_string(path)
                .with_context(|| format!("Failed to read text file: {}", path.display()))
        }

        _ => Err(anyhow::anyhow!(
            "Unsupported document format: {}. Only text, Markdown and PDF files are supported.",
            mime_type
        )),
    }
}

/// Collapse repeated spaces and cap blank-line runs at one paragraph break
fn normalize_whitespace(text: &str) -> String {
    let result = text.replace('\r', "");

    let mut prev_char = ' ';
    let mut newline_count = 0;
    let mut normalized = String::with_capacity(result.len());

    for c in result.chars() {
        if c == '\n' {
            newline_count += 1;
            continue;
        }

        if newline_count > 0 {
            normalized.push_str(if newline_count >= 2 { "\n\n" } else { "\n" });
            newline_count = 0;
        }

        if !(c == ' ' && prev_char == ' ') {
            normalized.push(c);
        }
        prev_char = c;
    }

    normalized.trim().to_string()
}
