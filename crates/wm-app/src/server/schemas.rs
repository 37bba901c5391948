use axum::Json;
use axum::extract::Multipart;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;
use wm_core::SceneClass;
use wm_core::ply::PlySummary;

use crate::error::{ErrorKind, GenerationError};
use crate::studio::{Artifact, GenerationRequest, SceneOutputs, WorldOutputs};

/// JSON body of the text-driven generation endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct TextRequest {
    pub prompt: String,
    #[serde(default)]
    pub labels_fg1: Option<String>,
    #[serde(default)]
    pub labels_fg2: Option<String>,
    #[serde(default)]
    pub class: SceneClass,
    #[serde(default)]
    pub use_sharp: bool,
    #[serde(default)]
    pub return_mesh: bool,
}

impl From<TextRequest> for GenerationRequest {
    fn from(body: TextRequest) -> Self {
        Self {
            prompt: body.prompt,
            labels_fg1: body.labels_fg1,
            labels_fg2: body.labels_fg2,
            class: body.class,
            image: None,
            use_sharp: body.use_sharp,
            return_mesh: body.return_mesh,
        }
    }
}

/// A JSON body that failed to parse gets the same envelope as a bad form.
pub fn rejected_body(rejection: JsonRejection) -> GenerationError {
    debug!("Rejected request body: {}", rejection);
    GenerationError::invalid_input(format!("Invalid request body: {}", rejection.body_text()))
}

/// Read a multipart form of the image-driven endpoints. The upload goes in
/// the `image` field, everything else mirrors [`TextRequest`].
pub async fn read_form(mut multipart: Multipart) -> Result<GenerationRequest, GenerationError> {
    let malformed = |e: axum::extract::multipart::MultipartError| {
        GenerationError::invalid_input(format!("Malformed form data: {}", e))
    };

    let mut request = GenerationRequest::default();
    while let Some(field) = multipart.next_field().await.map_err(malformed)? {
        let name = field.name().unwrap_or_default().to_string();
        if name == "image" {
            let data: Bytes = field.bytes().await.map_err(malformed)?;
            if !data.is_empty() {
                request.image = Some(data);
            }
            continue;
        }

        let value = field.text().await.map_err(malformed)?;
        match name.as_str() {
            "prompt" => request.prompt = value,
            "labels_fg1" => request.labels_fg1 = Some(value),
            "labels_fg2" => request.labels_fg2 = Some(value),
            "class" => {
                request.class = value
                    .parse()
                    .map_err(|e: wm_core::error::Error| GenerationError::invalid_input(e.to_string()))?
            }
            "use_sharp" => request.use_sharp = is_checked(&value),
            "return_mesh" => request.return_mesh = is_checked(&value),
            other => debug!("Ignoring form field {:?}", other),
        }
    }

    Ok(request)
}

fn is_checked(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "on" | "true" | "1" | "yes"
    )
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub kind: ErrorKind,
    pub message: String,
    pub trace: Option<String>,
}

impl ErrorBody {
    fn new(err: &GenerationError, show_errors: bool) -> Self {
        Self {
            kind: err.kind,
            message: err.message.clone(),
            trace: err.trace.clone().filter(|_| show_errors),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct InitResponse {
    pub status: String,
    pub error: Option<ErrorBody>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct WorldResponse {
    pub status: String,
    pub request_id: Option<Uuid>,
    pub output_dir: Option<String>,
    pub panorama: Option<Artifact>,
    pub mesh: Option<Artifact>,
    pub error: Option<ErrorBody>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SceneResponse {
    pub status: String,
    pub request_id: Option<Uuid>,
    pub output_dir: Option<String>,
    pub artifact: Option<Artifact>,
    pub summary: Option<PlySummary>,
    pub reconstructed: bool,
    pub error: Option<ErrorBody>,
}

/// Every adapter answers with a body; failures only change the status code.
fn reply<T: Serialize>(code: StatusCode, body: T) -> Response {
    (code, Json(body)).into_response()
}

impl InitResponse {
    pub fn reply(result: Result<String, GenerationError>, show_errors: bool) -> Response {
        match result {
            Ok(status) => reply(StatusCode::OK, Self { status, error: None }),
            Err(e) => reply(
                e.kind.status_code(),
                Self {
                    status: e.status(show_errors),
                    error: Some(ErrorBody::new(&e, show_errors)),
                },
            ),
        }
    }
}

impl WorldResponse {
    pub fn reply(result: Result<WorldOutputs, GenerationError>, show_errors: bool) -> Response {
        match result {
            Ok(out) => reply(
                StatusCode::OK,
                Self {
                    status: out.status,
                    request_id: Some(out.request_id),
                    output_dir: Some(out.output_dir),
                    panorama: Some(out.panorama),
                    mesh: out.mesh,
                    error: None,
                },
            ),
            Err(e) => reply(
                e.kind.status_code(),
                Self {
                    status: e.status(show_errors),
                    error: Some(ErrorBody::new(&e, show_errors)),
                    ..Self::default()
                },
            ),
        }
    }
}

impl SceneResponse {
    pub fn reply(result: Result<SceneOutputs, GenerationError>, show_errors: bool) -> Response {
        match result {
            Ok(out) => reply(
                StatusCode::OK,
                Self {
                    status: out.status,
                    request_id: Some(out.request_id),
                    output_dir: Some(out.output_dir),
                    artifact: Some(out.artifact),
                    summary: Some(out.summary),
                    reconstructed: out.reconstructed,
                    error: None,
                },
            ),
            Err(e) => reply(
                e.kind.status_code(),
                Self {
                    status: e.status(show_errors),
                    error: Some(ErrorBody::new(&e, show_errors)),
                    ..Self::default()
                },
            ),
        }
    }
}
