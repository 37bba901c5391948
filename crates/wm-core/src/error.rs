use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Failed to reach model service: {0}")]
    Unreachable(String),

    #[error("Model service returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Model service error: {message}")]
    Service {
        message: String,
        traceback: Option<String>,
    },

    #[error("Unexpected status from model service: {0}")]
    UnexpectedStatus(String),

    #[error("Invalid artifact: {0}")]
    InvalidArtifact(String),

    #[error("Unknown {kind}: {value:?}")]
    Parse { kind: &'static str, value: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Traceback reported by the model service, if it sent one
    pub fn service_traceback(&self) -> Option<&str> {
        match self {
            Self::Service { traceback, .. } => traceback.as_deref(),
            _ => None,
        }
    }
}
