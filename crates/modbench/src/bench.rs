use std::fmt;
use std::future::Future;
use std::io::{self, Write};
use std::time::Instant;

use aws_sdk_rekognition::operation::detect_moderation_labels::DetectModerationLabelsOutput;
use reqwest::Client;
use url::Url;

use crate::config::BenchConfig;
use crate::fetch::fetch_image;
use crate::providers::errors::DetectError;
use crate::providers::rekognition::RekognitionProvider;
use crate::providers::vision::{SafeSearchAnnotation, VisionProvider};

/// One timed benchmark run.
#[derive(Debug, Clone, PartialEq)]
pub struct TimedRun {
    pub label: String,
    pub seconds: f64,
}

impl fmt::Display for TimedRun {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {:.6} seconds", self.label, self.seconds)
    }
}

/// Run an action to completion and report how long it took. The action's
/// result is not propagated: a failure is logged and the timing is reported
/// either way.
pub async fn measure<T, Fut>(label: &str, action: Fut) -> TimedRun
where
    Fut: Future<Output = Result<T, DetectError>>,
{
    let start = Instant::now();
    if let Err(err) = action.await {
        tracing::warn!(label, error = %err, "benchmark action failed");
    }

    TimedRun {
        label: label.to_string(),
        seconds: start.elapsed().as_secs_f64(),
    }
}

/// The two detection clients plus the fetch client, wired together for a run.
pub struct Benchmark {
    rekognition: RekognitionProvider,
    vision: VisionProvider,
    http: Client,
}

impl Benchmark {
    pub fn new(rekognition: RekognitionProvider, vision: VisionProvider, http: Client) -> Self {
        Self {
            rekognition,
            vision,
            http,
        }
    }

    pub async fn from_config(config: &BenchConfig) -> Result<Self, DetectError> {
        let rekognition =
            RekognitionProvider::from_env(&config.aws_region, config.http_timeout).await?;
        let vision =
            VisionProvider::from_credentials_json(&config.gcloud_credentials, config.http_timeout)?;
        let http = Client::builder()
            .timeout(config.http_timeout)
            .build()
            .map_err(|err| {
                DetectError::RequestFailed(format!("failed to build http client: {err}"))
            })?;

        Ok(Self::new(rekognition, vision, http))
    }

    /// Download the image, then submit its bytes to the moderation-label
    /// detector.
    pub async fn moderation_by_upload(
        &self,
        url: &str,
    ) -> Result<DetectModerationLabelsOutput, DetectError> {
        let image = fetch_image(&self.http, url)
            .await
            .map_err(|err| DetectError::Download(err.to_string()))?;
        self.rekognition.detect_moderation_labels(&image).await
    }

    /// Hand the URL straight to the safe-search detector; the service does
    /// its own fetch.
    pub async fn safe_search_by_reference(
        &self,
        url: &str,
    ) -> Result<SafeSearchAnnotation, DetectError> {
        self.vision.safe_search_uri(url).await
    }

    /// Download the image, then submit its bytes to the safe-search detector.
    pub async fn safe_search_by_upload(
        &self,
        url: &str,
    ) -> Result<SafeSearchAnnotation, DetectError> {
        let image = fetch_image(&self.http, url)
            .await
            .map_err(|err| DetectError::Download(err.to_string()))?;
        self.vision.safe_search_bytes(&image).await
    }

    /// Bulk submission extension point; not part of the standard run.
    /// Downloads are sequential and fail fast: the first failure abandons the
    /// already-downloaded images and later URLs are never requested.
    pub async fn batch_safe_search(
        &self,
        urls: &[String],
    ) -> Result<Vec<SafeSearchAnnotation>, DetectError> {
        let mut images = Vec::with_capacity(urls.len());
        for url in urls {
            let image = fetch_image(&self.http, url)
                .await
                .map_err(|err| DetectError::Download(err.to_string()))?;
            images.push(image);
        }

        self.vision.batch_safe_search(&images).await
    }

    /// The standard benchmark: three call patterns against each URL,
    /// pattern-major, one line of output per timed run.
    pub async fn run<W: Write>(&self, urls: &[String], out: &mut W) -> io::Result<()> {
        for url in urls {
            let label = format!("AWS / {}", image_name(url));
            let timed = measure(&label, self.moderation_by_upload(url)).await;
            writeln!(out, "{timed}")?;
        }

        for url in urls {
            let label = format!("GCP(url) / {}", image_name(url));
            let timed = measure(&label, self.safe_search_by_reference(url)).await;
            writeln!(out, "{timed}")?;
        }

        for url in urls {
            let label = format!("GCP(download) / {}", image_name(url));
            let timed = measure(&label, self.safe_search_by_upload(url)).await;
            writeln!(out, "{timed}")?;
        }

        Ok(())
    }
}

/// Short display name for an image URL: the file stem of its last path
/// segment, or the whole URL when there is no usable path.
pub fn image_name(url: &str) -> String {
    let file = Url::parse(url).ok().and_then(|parsed| {
        parsed
            .path_segments()
            .and_then(|segments| segments.last().map(str::to_string))
    });

    match file {
        Some(file) if !file.is_empty() => file
            .split('.')
            .next()
            .unwrap_or(file.as_str())
            .to_string(),
        _ => url.to_string(),
    }
}
