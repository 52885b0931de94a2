#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("{0}")]
    Transport(String),
    #[error("server responded with status {0}")]
    Status(u16),
    #[error("{0}")]
    Camera(String),
    #[error("{0}")]
    Capture(String),
    #[error("unknown assessment type: {0}")]
    InvalidAssessmentType(String),
    // Froms
    #[error("{0}")]
    Encode(#[from] png::EncodingError),
    #[error("{0}")]
    Serialization(#[from] serde_json::Error),
    #[error("no async runtime available: {0}")]
    Runtime(#[from] tokio::runtime::TryCurrentError),
}
