use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use bytes::Bytes;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use url::Url;

use super::errors::DetectError;
use super::gcp_auth::{ServiceAccountKey, TokenMinter};

pub const VISION_API_HOST: &str = "https://vision.googleapis.com";

const SAFE_SEARCH_FEATURE: &str = "SAFE_SEARCH_DETECTION";

/// Likelihood ratings as reported by the safe-search detector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Likelihood {
    #[default]
    Unknown,
    VeryUnlikely,
    Unlikely,
    Possible,
    Likely,
    VeryLikely,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SafeSearchAnnotation {
    pub adult: Likelihood,
    pub spoof: Likelihood,
    pub medical: Likelihood,
    pub violence: Likelihood,
    pub racy: Likelihood,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct AnnotateImageResponse {
    safe_search_annotation: Option<SafeSearchAnnotation>,
    error: Option<RpcStatus>,
}

#[derive(Debug, Deserialize)]
struct RpcStatus {
    #[serde(default)]
    code: i32,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Default, Deserialize)]
struct BatchAnnotateResponse {
    #[serde(default)]
    responses: Vec<AnnotateImageResponse>,
}

#[derive(Debug)]
pub enum VisionAuth {
    /// Service account key; bearer tokens are minted on demand.
    ServiceAccount(TokenMinter),
    /// Pre-issued bearer token, mainly for tests against a local mock.
    StaticToken(String),
}

/// Client for the Cloud Vision safe-search detector.
#[derive(Debug)]
pub struct VisionProvider {
    client: Client,
    host: String,
    auth: VisionAuth,
}

impl VisionProvider {
    pub fn new(auth: VisionAuth, timeout: Duration) -> Result<Self, DetectError> {
        let client = Client::builder().timeout(timeout).build().map_err(|err| {
            DetectError::RequestFailed(format!("failed to build http client: {err}"))
        })?;

        Ok(Self {
            client,
            host: VISION_API_HOST.to_string(),
            auth,
        })
    }

    /// Construct from the credentials blob handed over verbatim in
    /// `GCLOUD_CREDENTIALS`. An unparseable blob is a construction failure,
    /// before any detection call is attempted.
    pub fn from_credentials_json(blob: &str, timeout: Duration) -> Result<Self, DetectError> {
        let key = ServiceAccountKey::from_json(blob)?;
        Self::new(VisionAuth::ServiceAccount(TokenMinter::new(key)), timeout)
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Safe-search with the image passed by reference; the service performs
    /// its own fetch, no local download happens on this path.
    pub async fn safe_search_uri(&self, image_uri: &str) -> Result<SafeSearchAnnotation, DetectError> {
        let payload = json!({
            "requests": [{
                "image": { "source": { "imageUri": image_uri } },
                "features": [{ "type": SAFE_SEARCH_FEATURE }]
            }]
        });

        let response = self.annotate(payload).await?;
        Self::single(response)
    }

    /// Safe-search with locally supplied image bytes.
    pub async fn safe_search_bytes(&self, image: &[u8]) -> Result<SafeSearchAnnotation, DetectError> {
        let payload = json!({
            "requests": [{
                "image": { "content": BASE64.encode(image) },
                "features": [{ "type": SAFE_SEARCH_FEATURE }]
            }]
        });

        let response = self.annotate(payload).await?;
        Self::single(response)
    }

    /// One batched annotate call over several images, requesting only the
    /// safe-search feature with no per-label metadata.
    pub async fn batch_safe_search(
        &self,
        images: &[Bytes],
    ) -> Result<Vec<SafeSearchAnnotation>, DetectError> {
        let requests: Vec<Value> = images
            .iter()
            .map(|image| {
                json!({
                    "image": { "content": BASE64.encode(image) },
                    "features": [{ "type": SAFE_SEARCH_FEATURE, "maxResults": 0 }]
                })
            })
            .collect();

        let response = self.annotate(json!({ "requests": requests })).await?;

        response
            .responses
            .into_iter()
            .enumerate()
            .map(|(index, entry)| Self::annotation(entry).map_err(|err| match err {
                DetectError::RequestFailed(message) => {
                    DetectError::RequestFailed(format!("image {index}: {message}"))
                }
                other => other,
            }))
            .collect()
    }

    async fn annotate(&self, payload: Value) -> Result<BatchAnnotateResponse, DetectError> {
        let base_url = Url::parse(&self.host)
            .map_err(|err| DetectError::RequestFailed(format!("invalid base URL: {err}")))?;
        let url = base_url.join("v1/images:annotate").map_err(|err| {
            DetectError::RequestFailed(format!("failed to construct endpoint URL: {err}"))
        })?;

        let token = match &self.auth {
            VisionAuth::ServiceAccount(minter) => minter.bearer_token(&self.client).await?,
            VisionAuth::StaticToken(token) => token.clone(),
        };

        let response = self
            .client
            .post(url)
            .bearer_auth(token)
            .json(&payload)
            .send()
            .await
            .map_err(|err| DetectError::RequestFailed(format!("request failed: {err}")))?;

        let status = response.status();
        let body: Option<Value> = response.json().await.ok();

        match status {
            StatusCode::OK => {
                let body = body.ok_or_else(|| {
                    DetectError::RequestFailed("response body is not valid JSON".to_string())
                })?;
                serde_json::from_value(body).map_err(|err| {
                    DetectError::RequestFailed(format!("malformed annotate response: {err}"))
                })
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(DetectError::Authentication(format!(
                    "status: {status}, response: {body:?}"
                )))
            }
            StatusCode::TOO_MANY_REQUESTS => {
                Err(DetectError::RateLimitExceeded(format!("{body:?}")))
            }
            status if status.is_server_error() => Err(DetectError::ServerError(format!(
                "status: {status}, response: {body:?}"
            ))),
            _ => {
                let message = body
                    .as_ref()
                    .and_then(|body| body.get("error"))
                    .and_then(|error| error.get("message"))
                    .and_then(|message| message.as_str())
                    .unwrap_or("unknown error")
                    .to_string();
                tracing::debug!("annotate request failed with status {status}: {body:?}");
                Err(DetectError::RequestFailed(format!(
                    "status: {status}, message: {message}"
                )))
            }
        }
    }

    fn single(response: BatchAnnotateResponse) -> Result<SafeSearchAnnotation, DetectError> {
        let entry = response
            .responses
            .into_iter()
            .next()
            .ok_or_else(|| DetectError::RequestFailed("empty annotate response".to_string()))?;
        Self::annotation(entry)
    }

    fn annotation(entry: AnnotateImageResponse) -> Result<SafeSearchAnnotation, DetectError> {
        if let Some(error) = entry.error {
            return Err(DetectError::RequestFailed(format!(
                "annotate error {}: {}",
                error.code, error.message
            )));
        }
        entry.safe_search_annotation.ok_or_else(|| {
            DetectError::RequestFailed("no safe-search annotation in response".to_string())
        })
    }
}
