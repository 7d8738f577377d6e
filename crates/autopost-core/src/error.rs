use std::io;

use thiserror::Error;

/// Problems with the configuration surface. Always raised before any network call.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required configuration: {0}")]
    Missing(String),
    #[error("invalid value for {key}: {reason}")]
    Invalid { key: String, reason: String },
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("TOML serialization error: {0}")]
    Ser(#[from] toml::ser::Error),
}

impl ConfigError {
    pub fn invalid(key: impl Into<String>, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            key: key.into(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("no resolvable publish date within {days} days of {now}")]
    NoResolvableDate { now: String, days: u32 },
}

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("malformed model output: {0}")]
    Malformed(String),
    #[error("generative API responded with {status}: {body}")]
    Api { status: u16, body: String },
    #[error("generative API returned no text")]
    EmptyResponse,
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("generation failed after {attempts} attempts: {last}")]
    Exhausted {
        attempts: u32,
        #[source]
        last: Box<GenerationError>,
    },
}

/// Failures talking to the blogging platform.
#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("missing credentials: {0}")]
    MissingCredentials(String),
    #[error("token exchange did not return an access token: {0}")]
    NoToken(String),
    #[error("platform responded with {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Top-level failure of a run, tagged with the stage that failed.
#[derive(Debug, Error)]
pub enum AutopostError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("schedule resolution failed: {0}")]
    Resolve(#[from] ResolveError),
    #[error("content generation failed: {0}")]
    Generation(#[from] GenerationError),
    #[error("authentication failed: {0}")]
    Authentication(#[source] PlatformError),
    #[error("listing scheduled posts failed: {0}")]
    Listing(#[source] PlatformError),
    #[error("publish failed: {0}")]
    Publish(#[source] PlatformError),
}

impl AutopostError {
    /// Process exit code for this failure. Zero is reserved for success and clean skips.
    pub fn exit_code(&self) -> i32 {
        match self {
            AutopostError::Config(_) => 2,
            AutopostError::Authentication(PlatformError::MissingCredentials(_))
            | AutopostError::Listing(PlatformError::MissingCredentials(_))
            | AutopostError::Publish(PlatformError::MissingCredentials(_)) => 2,
            AutopostError::Resolve(_) => 3,
            AutopostError::Generation(_) => 4,
            AutopostError::Authentication(_) => 5,
            AutopostError::Listing(_) | AutopostError::Publish(_) => 6,
        }
    }

    pub fn stage(&self) -> &'static str {
        match self {
            AutopostError::Config(_) => "configuration",
            AutopostError::Resolve(_) => "schedule",
            AutopostError::Generation(_) => "generation",
            AutopostError::Authentication(_) => "authentication",
            AutopostError::Listing(_) => "listing",
            AutopostError::Publish(_) => "publish",
        }
    }
}
