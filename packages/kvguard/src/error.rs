#[derive(Debug, thiserror::Error)]
pub enum KvError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Authentication failed: {0}")]
    Authentication(String),
    #[error("Vault not found: {0}")]
    VaultNotFound(String),
    #[error("Invalid path: {0}")]
    InvalidPath(String),
    #[error("Access denied: {0}")]
    AccessDenied(String),
    #[error("Aborted: {0}")]
    Aborted(String),
    #[error("Service error: {0}")]
    Service(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Unrecognized backup file: {0}")]
    UnrecognizedFormat(String),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl KvError {
    /// True for errors that invalidate the whole run before any item is
    /// processed (auth, vault lookup, path preparation).
    pub fn is_setup(&self) -> bool {
        matches!(
            self,
            KvError::Authentication(_)
                | KvError::VaultNotFound(_)
                | KvError::InvalidPath(_)
                | KvError::Aborted(_)
        )
    }
}

pub type KvResult<T> = Result<T, KvError>;
