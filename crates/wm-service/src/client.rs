use std::time::Duration;

use reqwest::Response;
use serde::Serialize;
use tracing::debug;
use wm_core::artifact::WorldAsset;
use wm_core::error::{Error, Result};

use crate::schemas::{ARTIFACT_KIND_HEADER, HealthResponse, ServiceResponse};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// HTTP client for the model service.
///
/// Generation calls carry no overall timeout: a model call blocks until the
/// service answers.
#[derive(Debug, Clone)]
pub struct ServiceClient {
    http: reqwest::Client,
    base_url: String,
}

impl ServiceClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| Error::Unreachable(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn unreachable(&self, e: reqwest::Error) -> Error {
        Error::Unreachable(format!(
            "{}. Make sure the model service is running at {}",
            e, self.base_url
        ))
    }

    pub async fn health(&self) -> Result<HealthResponse> {
        let response = self
            .http
            .get(self.url("/health"))
            .send()
            .await
            .map_err(|e| self.unreachable(e))?;

        let response = check_status(response).await?;
        response
            .json()
            .await
            .map_err(|e| Error::UnexpectedStatus(format!("Failed to parse health response: {}", e)))
    }

    /// POST a JSON body and unwrap the `{status, ...}` envelope.
    pub async fn post_json<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<ServiceResponse> {
        debug!("POST {}", path);

        let response = self
            .http
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(|e| self.unreachable(e))?;

        let response = check_status(response).await?;
        let envelope: ServiceResponse = response
            .json()
            .await
            .map_err(|e| Error::UnexpectedStatus(format!("Failed to parse response: {}", e)))?;

        into_result(envelope)
    }

    /// POST a JSON body and read the serialized world asset from the response.
    pub async fn post_for_asset<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        expect_mesh: bool,
    ) -> Result<WorldAsset> {
        debug!("POST {} (asset)", path);

        let response = self
            .http
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(|e| self.unreachable(e))?;

        let response = check_status(response).await?;

        let is_mesh = match response
            .headers()
            .get(ARTIFACT_KIND_HEADER)
            .and_then(|v| v.to_str().ok())
        {
            Some("mesh") => true,
            Some("splat") => false,
            Some(other) => {
                return Err(Error::UnexpectedStatus(format!(
                    "Unknown artifact kind: {}",
                    other
                )));
            }
            None => expect_mesh,
        };

        let body = response
            .bytes()
            .await
            .map_err(|e| self.unreachable(e))?;

        Ok(if is_mesh {
            WorldAsset::Mesh(body)
        } else {
            WorldAsset::Splat(body)
        })
    }

    pub async fn delete(&self, path: &str) -> Result<()> {
        debug!("DELETE {}", path);

        let response = self
            .http
            .delete(self.url(path))
            .send()
            .await
            .map_err(|e| self.unreachable(e))?;

        check_status(response).await?;
        Ok(())
    }
}

/// Turn non-2xx responses into errors, keeping the service's own message
/// and traceback when the body is an error envelope.
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    if let Ok(ServiceResponse {
        error: Some(message),
        traceback,
        ..
    }) = serde_json::from_str::<ServiceResponse>(&body)
    {
        return Err(Error::Service { message, traceback });
    }

    Err(Error::Http {
        status: status.as_u16(),
        body,
    })
}

fn into_result(envelope: ServiceResponse) -> Result<ServiceResponse> {
    match envelope.status.as_str() {
        "success" | "ok" => Ok(envelope),
        "error" => Err(Error::Service {
            message: envelope
                .error
                .unwrap_or_else(|| "Unknown error".to_string()),
            traceback: envelope.traceback,
        }),
        _ => Err(Error::UnexpectedStatus(envelope.status)),
    }
}
