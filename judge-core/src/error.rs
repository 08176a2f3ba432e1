use std::io;
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum JudgeCoreError {
    #[error("IO error: {0}")]
    IOError(#[from] io::Error),
    #[error("Serde json error: {0}")]
    SerdeJsonError(#[from] serde_json::Error),
    #[error("Sandbox error: {0}")]
    SandboxError(String),
    #[error("Metadata error: {0}")]
    MetadataError(String),
    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),
    #[error("Task info error: {0}")]
    TaskInfoError(String),
    #[error("{0}")]
    AnyhowError(#[from] anyhow::Error),
}

pub fn path_not_exist(path: &Path) -> JudgeCoreError {
    JudgeCoreError::AnyhowError(anyhow::anyhow!("Path not exist: {:?}", path))
}
