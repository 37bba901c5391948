use axum::http::StatusCode;
use serde::Serialize;
use thiserror::Error;
use wm_core::ModelFamily;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Error from backend: {0}")]
    BackendError(String),

    #[error("{} is not initialized", .0.name())]
    NotInitialized(ModelFamily),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("{0:?} is not a request output directory")]
    UnknownOutput(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotInitialized,
    InvalidInput,
    InitializationFailed,
    GenerationFailed,
}

impl ErrorKind {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotInitialized => StatusCode::CONFLICT,
            Self::InvalidInput => StatusCode::BAD_REQUEST,
            Self::InitializationFailed | Self::GenerationFailed => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Failure of one adapter call, ready to be shown to the user
#[derive(Error, Debug, Clone, Serialize)]
#[error("{message}")]
pub struct GenerationError {
    pub kind: ErrorKind,
    pub message: String,
    pub trace: Option<String>,
}

impl GenerationError {
    pub fn not_initialized(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::NotInitialized,
            message: message.into(),
            trace: None,
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::InvalidInput,
            message: message.into(),
            trace: None,
        }
    }

    /// Capture an error with its full cause chain and any traceback the
    /// model service attached.
    pub fn from_error(kind: ErrorKind, err: anyhow::Error) -> Self {
        let kind = match err.downcast_ref::<AppError>() {
            Some(AppError::InvalidInput(_)) => ErrorKind::InvalidInput,
            Some(AppError::NotInitialized(_)) => ErrorKind::NotInitialized,
            _ => kind,
        };

        let mut trace = format!("{:?}", err);
        let service_traceback = err.chain().find_map(|cause| {
            cause
                .downcast_ref::<wm_core::error::Error>()
                .and_then(|e| e.service_traceback())
        });
        if let Some(tb) = service_traceback {
            trace.push_str("\n\nModel service traceback:\n");
            trace.push_str(tb);
        }

        Self {
            kind,
            message: format!("{:#}", err),
            trace: Some(trace),
        }
    }

    /// Status line for the UI
    pub fn status(&self, show_trace: bool) -> String {
        match (self.kind, &self.trace) {
            (ErrorKind::NotInitialized, _) => self.message.clone(),
            (ErrorKind::InvalidInput, _) => format!("⚠️ {}", self.message),
            (_, Some(trace)) if show_trace => format!("❌ Error: {}\n{}", self.message, trace),
            _ => format!("❌ Error: {}", self.message),
        }
    }
}
