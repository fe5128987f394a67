use std::env;
use std::time::Duration;

use thiserror::Error;

/// Environment variable holding the Cloud Vision service account key, as a
/// verbatim JSON blob.
pub const GCLOUD_CREDENTIALS_ENV: &str = "GCLOUD_CREDENTIALS";

pub const AWS_REGION_ENV: &str = "AWS_REGION";
pub const HTTP_TIMEOUT_ENV: &str = "MODBENCH_HTTP_TIMEOUT_SECS";

/// Region the Rekognition benchmark has always targeted.
pub const DEFAULT_AWS_REGION: &str = "ap-northeast-1";

pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(60);

/// Image set served from the Rekognition demo CDN.
pub const DEFAULT_IMAGE_URLS: &[&str] = &[
    "https://dhei5unw3vrsx.cloudfront.net/images/family_picnic_resized.jpg",
    "https://dhei5unw3vrsx.cloudfront.net/images/yoga_swimwear_resized.jpg",
];

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),

    #[error("invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },
}

/// Ambient settings for one benchmark process, resolved once at startup and
/// passed down to the client constructors.
#[derive(Debug, Clone)]
pub struct BenchConfig {
    /// Region for the Rekognition client. The rest of the AWS auth material
    /// resolves through the SDK's default credential chain.
    pub aws_region: String,
    /// Service account key JSON, passed verbatim to the Vision client.
    pub gcloud_credentials: String,
    /// Per-call deadline for the fetch client and both detection clients.
    pub http_timeout: Duration,
}

impl BenchConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let gcloud_credentials = env::var(GCLOUD_CREDENTIALS_ENV)
            .map_err(|_| ConfigError::Missing(GCLOUD_CREDENTIALS_ENV))?;

        let aws_region =
            env::var(AWS_REGION_ENV).unwrap_or_else(|_| DEFAULT_AWS_REGION.to_string());

        let http_timeout = match env::var(HTTP_TIMEOUT_ENV) {
            Ok(raw) => {
                let secs = raw.parse::<u64>().map_err(|err| ConfigError::Invalid {
                    key: HTTP_TIMEOUT_ENV,
                    message: err.to_string(),
                })?;
                Duration::from_secs(secs)
            }
            Err(_) => DEFAULT_HTTP_TIMEOUT,
        };

        Ok(Self {
            aws_region,
            gcloud_credentials,
            http_timeout,
        })
    }
}
