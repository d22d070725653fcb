use thiserror::Error;

#[derive(Error, Debug)]
pub enum UploadError {
    #[error("Settings error: {0}")]
    Settings(#[from] bridge_traits::BridgeError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, UploadError>;
