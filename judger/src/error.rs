#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Internal Error: {0}")]
    InternalError(anyhow::Error),
    #[error("Reqwest Error: {0}")]
    ReqwestError(#[from] reqwest::Error),
    #[error("Serde Json Error: {0}")]
    SerdeJsonError(#[from] serde_json::Error),
}
