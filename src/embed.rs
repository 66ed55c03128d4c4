use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use parking_lot::Mutex;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

use crate::error::{EngineError, Result};
use crate::models::{lowercase_extension, Classification, FileRecord};

const SUPPORTED_TEXT_EXTENSIONS: &[&str] = &[
    "txt",
    "md",
    "rs",
    "py",
    "js",
    "json",
    "yaml",
    "yml",
    "toml",
    "css",
    "html",
    "htm",
    "xml",
    "csv",
    "log",
];

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "webp"];

/// What gets handed to an embedder: extracted text, or raw bytes for images.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    Text(String),
    Bytes(Vec<u8>),
}

impl Content {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Content::Text(text) => text.as_bytes(),
            Content::Bytes(bytes) => bytes,
        }
    }

    pub fn content_hash(&self) -> String {
        blake3::hash(self.as_bytes()).to_hex().to_string()
    }
}

#[async_trait]
pub trait ContentSource: Send + Sync {
    async fn load(&self, path: &Path) -> Result<Content>;
}

#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, content: &Content) -> Result<Vec<f32>>;
}

#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, record: &FileRecord) -> Result<Classification>;
}

/// Reads file content from local disk: plain text for known text formats,
/// extracted text for PDFs, raw bytes for images.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileContentSource;

#[async_trait]
impl ContentSource for FileContentSource {
    async fn load(&self, path: &Path) -> Result<Content> {
        let extension = lowercase_extension(path);

        match extension.as_str() {
            "pdf" => {
                let bytes = tokio::fs::read(path).await?;
                pdf_extract::extract_text_from_mem(&bytes)
                    .map(Content::Text)
                    .map_err(|e| EngineError::PdfExtraction(e.to_string()))
            }
            _ if SUPPORTED_TEXT_EXTENSIONS.contains(&extension.as_str()) => {
                Ok(Content::Text(tokio::fs::read_to_string(path).await?))
            }
            _ if IMAGE_EXTENSIONS.contains(&extension.as_str()) => {
                Ok(Content::Bytes(tokio::fs::read(path).await?))
            }
            _ => Err(EngineError::UnsupportedFileType(extension)),
        }
    }
}

/// Local text embedding with fastembed. Inference runs on the blocking pool.
pub struct FastEmbedder {
    model: Arc<Mutex<TextEmbedding>>,
}

impl FastEmbedder {
    pub fn new() -> Result<Self> {
        Self::with_model(EmbeddingModel::AllMiniLML6V2)
    }

    pub fn with_model(model: EmbeddingModel) -> Result<Self> {
        let options = InitOptions::new(model).with_show_download_progress(true);
        let model =
            TextEmbedding::try_new(options).map_err(|e| EngineError::Embedding(e.to_string()))?;
        Ok(Self {
            model: Arc::new(Mutex::new(model)),
        })
    }
}

#[async_trait]
impl Embedder for FastEmbedder {
    async fn embed(&self, content: &Content) -> Result<Vec<f32>> {
        let text = match content {
            Content::Text(text) => text.clone(),
            Content::Bytes(_) => {
                return Err(EngineError::Embedding(
                    "text embedding model cannot embed binary content".to_string(),
                ))
            }
        };

        let embeddings =
            infer_blocking(&self.model, move |model| model.embed(vec![text], None)).await?;
        let embedding = embeddings
            .into_iter()
            .next()
            .ok_or_else(|| EngineError::Embedding("model returned no embedding".to_string()))?;

        debug!("Generated embedding with size: {}", embedding.len());
        Ok(embedding)
    }
}

/// Runs `infer` against the locked model on the blocking pool so synchronous
/// inference never stalls the async workers.
async fn infer_blocking<M, T, E, F>(model: &Arc<Mutex<M>>, infer: F) -> Result<T>
where
    M: Send + 'static,
    T: Send + 'static,
    E: fmt::Display,
    F: FnOnce(&mut M) -> std::result::Result<T, E> + Send + 'static,
{
    let model = Arc::clone(model);
    tokio::task::spawn_blocking(move || infer(&mut *model.lock()).map_err(|e| e.to_string()))
        .await
        .map_err(|e| EngineError::Embedding(format!("inference task failed: {e}")))?
        .map_err(EngineError::Embedding)
}

/// Labels a file from its MIME type as guessed from the extension.
/// Office formats and PDFs are labelled `document`; everything else gets the
/// MIME top-level type. Confidence is split evenly across the guesses.
#[derive(Debug, Clone, Copy, Default)]
pub struct MimeClassifier;

impl MimeClassifier {
    fn label_for(mime: &mime_guess::Mime) -> String {
        let subtype = mime.subtype().as_str();
        let is_document = mime.type_() == mime_guess::mime::APPLICATION
            && (subtype == "pdf"
                || subtype == "msword"
                || subtype == "rtf"
                || subtype.starts_with("vnd.openxmlformats-officedocument")
                || subtype.starts_with("vnd.oasis.opendocument")
                || subtype.starts_with("vnd.ms-"));
        if is_document {
            "document".to_string()
        } else {
            mime.type_().as_str().to_string()
        }
    }
}

#[async_trait]
impl Classifier for MimeClassifier {
    async fn classify(&self, record: &FileRecord) -> Result<Classification> {
        if record.is_dir {
            return Err(EngineError::Classification(format!(
                "{} is a directory",
                record.path.display()
            )));
        }

        let guess = mime_guess::from_path(&record.path);
        let count = guess.count();
        let mime = guess.first().ok_or_else(|| {
            EngineError::Classification(format!("no MIME type known for {}", record.name))
        })?;

        Ok(Classification {
            label: Self::label_for(&mime),
            confidence: 1.0 / count as f32,
        })
    }
}
