use thiserror::Error;

/// Failure stages of a detection operation. Wrapped once at the point of
/// occurrence; callers distinguish stages by variant.
#[derive(Error, Debug)]
pub enum DetectError {
    #[error("failed to download: {0}")]
    Download(String),

    #[error("invalid credential material: {0}")]
    Credentials(String),

    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    #[error("server error: {0}")]
    ServerError(String),

    #[error("request failed: {0}")]
    RequestFailed(String),
}
