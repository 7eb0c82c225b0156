//! Background documents about the represented person.
//!
//! Loaded once at startup into an immutable [`KnowledgeContext`]. Each document
//! is optional on its own; a context with no documents at all is an error.

use std::fs;
use std::panic;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{info, warn};

use crate::config::KnowledgeConfig;

const SECTION_SEPARATOR: &str = "\n\n---\n\n";

#[derive(Debug, Error)]
pub enum KnowledgeError {
    #[error(
        "failed to load any context documents from `{dir}`; expected at least one of: {expected}"
    )]
    NoDocuments { dir: PathBuf, expected: String },
}

#[derive(Debug, Error)]
enum DocumentError {
    #[error("could not read `{path}`: {source}")]
    Read { path: PathBuf, source: std::io::Error },
    #[error("could not extract text from `{path}`: {reason}")]
    Extract { path: PathBuf, reason: String },
    #[error("`{0}` contained no text")]
    Empty(PathBuf),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DocumentKind {
    About,
    Resume,
    LinkedIn,
}

impl DocumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::About => "about",
            Self::Resume => "resume",
            Self::LinkedIn => "linkedin",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KnowledgeContext {
    text: String,
    documents: Vec<DocumentKind>,
}

impl KnowledgeContext {
    pub fn load(config: &KnowledgeConfig) -> Result<Self, KnowledgeError> {
        let about = load_document(DocumentKind::About, &config.summary_path(), read_markdown);
        let resume = load_document(DocumentKind::Resume, &config.resume_path(), read_pdf);
        let linkedin = load_document(DocumentKind::LinkedIn, &config.linkedin_path(), read_pdf);

        let mut sections = Vec::new();
        let mut documents = Vec::new();

        if let Some(text) = about {
            sections.push(format!("## About {}\n{text}", config.subject_name));
            documents.push(DocumentKind::About);
        }
        if let Some(text) = resume {
            sections.push(format!("## Resume\n{text}"));
            documents.push(DocumentKind::Resume);
        }
        if let Some(text) = linkedin {
            sections.push(format!("## LinkedIn Profile\n{text}"));
            documents.push(DocumentKind::LinkedIn);
        }

        if sections.is_empty() {
            return Err(KnowledgeError::NoDocuments {
                dir: config.dir.clone(),
                expected: format!(
                    "{}, {}, {}",
                    config.summary_file, config.resume_file, config.linkedin_file
                ),
            });
        }

        let text = sections.join(SECTION_SEPARATOR);
        info!(
            event_name = "knowledge.loaded",
            correlation_id = "bootstrap",
            documents = documents.len(),
            characters = text.len(),
            "loaded knowledge context"
        );

        Ok(Self { text, documents })
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn documents(&self) -> &[DocumentKind] {
        &self.documents
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Checks a single knowledge document without building a context.
pub fn probe_document(kind: DocumentKind, path: &Path) -> Result<usize, String> {
    let reader = match kind {
        DocumentKind::About => read_markdown,
        DocumentKind::Resume | DocumentKind::LinkedIn => read_pdf,
    };
    reader(path).map(|text| text.len()).map_err(|error| error.to_string())
}

fn load_document(
    kind: DocumentKind,
    path: &Path,
    reader: fn(&Path) -> Result<String, DocumentError>,
) -> Option<String> {
    match reader(path) {
        Ok(text) => Some(text),
        Err(error) => {
            warn!(
                event_name = "knowledge.document.skipped",
                correlation_id = "bootstrap",
                document = kind.as_str(),
                error = %error,
                "skipping unreadable knowledge document"
            );
            None
        }
    }
}

fn read_markdown(path: &Path) -> Result<String, DocumentError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| DocumentError::Read { path: path.to_path_buf(), source })?;
    non_empty(path, raw)
}

fn read_pdf(path: &Path) -> Result<String, DocumentError> {
    if !path.exists() {
        return Err(DocumentError::Read {
            path: path.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "file does not exist"),
        });
    }

    // pdf-extract panics on some malformed inputs.
    let extracted = panic::catch_unwind(|| pdf_extract::extract_text(path)).map_err(|_| {
        DocumentError::Extract {
            path: path.to_path_buf(),
            reason: "extractor panicked".to_string(),
        }
    })?;
    let raw = extracted.map_err(|error| DocumentError::Extract {
        path: path.to_path_buf(),
        reason: error.to_string(),
    })?;
    non_empty(path, raw)
}

fn non_empty(path: &Path, raw: String) -> Result<String, DocumentError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(DocumentError::Empty(path.to_path_buf()));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::{probe_document, DocumentKind, KnowledgeContext, KnowledgeError};
    use crate::config::AppConfig;

    fn config_for(dir: &TempDir) -> crate::config::KnowledgeConfig {
        let mut config = AppConfig::default().knowledge;
        config.dir = dir.path().to_path_buf();
        config
    }

    #[test]
    fn loads_when_only_markdown_is_readable() {
        let dir = TempDir::new().expect("tempdir");
        fs::write(dir.path().join("summary.md"), "  Rust engineer.\n").expect("write summary");

        let context = KnowledgeContext::load(&config_for(&dir)).expect("one document suffices");

        assert_eq!(context.as_str(), "## About Samuel\nRust engineer.");
        assert_eq!(context.documents(), &[DocumentKind::About]);
    }

    #[test]
    fn fails_when_no_document_is_readable() {
        let dir = TempDir::new().expect("tempdir");

        let error = KnowledgeContext::load(&config_for(&dir)).expect_err("nothing to load");

        assert!(matches!(error, KnowledgeError::NoDocuments { .. }));
        assert!(error.to_string().contains("summary.md"));
    }

    #[test]
    fn corrupt_pdfs_are_skipped_not_fatal() {
        let dir = TempDir::new().expect("tempdir");
        fs::write(dir.path().join("summary.md"), "About me").expect("write summary");
        fs::write(dir.path().join("resume.pdf"), b"definitely not a pdf").expect("write resume");

        let context = KnowledgeContext::load(&config_for(&dir)).expect("markdown still loads");

        assert_eq!(context.documents(), &[DocumentKind::About]);
        assert!(!context.as_str().contains("## Resume"));
    }

    #[test]
    fn corrupt_pdfs_alone_are_fatal() {
        let dir = TempDir::new().expect("tempdir");
        fs::write(dir.path().join("resume.pdf"), b"garbage").expect("write resume");
        fs::write(dir.path().join("linkedin.pdf"), b"garbage").expect("write linkedin");

        assert!(KnowledgeContext::load(&config_for(&dir)).is_err());
    }

    #[test]
    fn three_present_but_unreadable_documents_are_fatal() {
        let dir = TempDir::new().expect("tempdir");
        fs::write(dir.path().join("summary.md"), [0xff, 0xfe, 0x00, 0xc3]).expect("write summary");
        fs::write(dir.path().join("resume.pdf"), b"%PDF-1.4 truncated").expect("write resume");
        fs::write(dir.path().join("linkedin.pdf"), b"garbage").expect("write linkedin");

        let error = KnowledgeContext::load(&config_for(&dir)).expect_err("nothing readable");

        assert!(matches!(error, KnowledgeError::NoDocuments { .. }));
    }

    #[test]
    fn blank_markdown_counts_as_missing() {
        let dir = TempDir::new().expect("tempdir");
        fs::write(dir.path().join("summary.md"), " \n\n ").expect("write summary");

        assert!(KnowledgeContext::load(&config_for(&dir)).is_err());
    }

    #[test]
    fn probe_reports_missing_files() {
        let dir = TempDir::new().expect("tempdir");
        let result = probe_document(DocumentKind::Resume, &dir.path().join("resume.pdf"));
        assert!(result.is_err());
    }
}
