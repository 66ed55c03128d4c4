use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("WalkDir error: {0}")]
    WalkDir(#[from] walkdir::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Embedding error: {0}")]
    Embedding(String),
    #[error("Classification error: {0}")]
    Classification(String),
    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),
    #[error("PDF extraction error: {0}")]
    PdfExtraction(String),
    #[error("Invalid search spec: {0}")]
    InvalidSpec(String),
    #[error("Vector dimension mismatch: {left} vs {right}")]
    DimensionMismatch { left: usize, right: usize },
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Operation cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, EngineError>;
