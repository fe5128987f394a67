use std::time::Duration;

use aws_config::timeout::TimeoutConfig;
use aws_config::Region;
use aws_sdk_rekognition::config::ProvideCredentials;
use aws_sdk_rekognition::operation::detect_moderation_labels::builders::DetectModerationLabelsFluentBuilder;
use aws_sdk_rekognition::operation::detect_moderation_labels::DetectModerationLabelsOutput;
use aws_sdk_rekognition::primitives::Blob;
use aws_sdk_rekognition::types::Image;
use aws_sdk_rekognition::Client as RekognitionClient;
use aws_smithy_types::error::display::DisplayErrorContext;

use super::errors::DetectError;

/// All labels are requested regardless of confidence; filtering is left to
/// whoever consumes the detection results.
pub const MIN_CONFIDENCE: f32 = 0.0;

/// Client for the Rekognition moderation-label detector.
#[derive(Debug, Clone)]
pub struct RekognitionProvider {
    client: RekognitionClient,
}

impl RekognitionProvider {
    /// Resolve AWS configuration from the default credential chain, scoped to
    /// `region`, with `timeout` as the per-operation deadline. Credential
    /// resolution failure is a construction failure, before any detection
    /// call is attempted.
    pub async fn from_env(region: &str, timeout: Duration) -> Result<Self, DetectError> {
        let timeout_config = TimeoutConfig::builder().operation_timeout(timeout).build();

        let aws_config = aws_config::from_env()
            .region(Region::new(region.to_string()))
            .timeout_config(timeout_config)
            .load()
            .await;

        match aws_config.credentials_provider() {
            Some(provider) => {
                provider.provide_credentials().await.map_err(|err| {
                    DetectError::Credentials(format!("unable to resolve AWS credentials: {err}"))
                })?;
            }
            None => {
                return Err(DetectError::Credentials(
                    "no AWS credentials provider configured".to_string(),
                ))
            }
        }

        Ok(Self {
            client: RekognitionClient::new(&aws_config),
        })
    }

    /// Construct from a prebuilt service config. Used by tests to point the
    /// client at a local endpoint.
    pub fn from_conf(conf: aws_sdk_rekognition::Config) -> Self {
        Self {
            client: RekognitionClient::from_conf(conf),
        }
    }

    fn moderation_request(&self, image: &[u8]) -> DetectModerationLabelsFluentBuilder {
        self.client
            .detect_moderation_labels()
            .image(Image::builder().bytes(Blob::new(image)).build())
            .min_confidence(MIN_CONFIDENCE)
    }

    pub async fn detect_moderation_labels(
        &self,
        image: &[u8],
    ) -> Result<DetectModerationLabelsOutput, DetectError> {
        self.moderation_request(image).send().await.map_err(|err| {
            DetectError::RequestFailed(format!(
                "moderation detection failed: {}",
                DisplayErrorContext(&err)
            ))
        })
    }
}
