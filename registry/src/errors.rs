use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("invalid agent draft: {0}")]
    InvalidDraft(String),
    #[error("voice '{0}' is not available")]
    UnknownVoice(String),
    #[error("unsupported status filter '{0}'")]
    InvalidStatus(String),
    #[error("page size {0} is not one of the offered options")]
    UnsupportedPageSize(usize),
    #[error("session store at {path} is corrupt: {detail}")]
    CorruptStore { path: PathBuf, detail: String },
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, RegistryError>;
