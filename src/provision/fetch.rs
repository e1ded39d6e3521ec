use std::{fmt::Display, path::Path, time::Duration};

use crate::error::{format_error, DeployError, DeployErrorKind};

/// Result of a single download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The body was written to the destination.
    Success,
    /// The server did not answer within the time limit.
    TimedOut,
    /// The request failed or the server returned a non-success status.
    TransportError(String),
    /// The body was received but could not be written.
    UnexpectedError(String),
}

impl FetchOutcome {
    /// Returns whether it is the Success variant.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

impl Display for FetchOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success => f.write_str("download complete"),
            Self::TimedOut => f.write_str("download timed out"),
            Self::TransportError(message) => write!(f, "download failed: {message}"),
            Self::UnexpectedError(message) => write!(f, "unexpected error: {message}"),
        }
    }
}

/// Downloads a URL to a local file.
///
/// Implementations make exactly one attempt and never panic; every
/// failure is reported through [`FetchOutcome`].
pub trait Fetcher {
    /// Downloads `url` into `destination`, giving up after `timeout`.
    fn fetch(&self, url: &str, destination: &Path, timeout: Duration) -> FetchOutcome;
}

/// [`Fetcher`] backed by a blocking HTTP client.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    /// Creates a fetcher with its own HTTP client.
    pub fn new() -> Result<Self, DeployError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("ariad/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client })
    }

    /// Creates a fetcher using the given HTTP client.
    pub fn with_client(client: reqwest::blocking::Client) -> Self {
        Self { client }
    }

    fn download(&self, url: &str, timeout: Duration) -> Result<Vec<u8>, DeployError> {
        let response = self.client.get(url).timeout(timeout).send()?;
        let status = response.status();

        // Redirects reqwest didn't follow (304, 300 without Location) carry no executable.
        if !status.is_success() {
            return Err(DeployError::new(DeployErrorKind::Transport)
                .with_context(format!("HTTP status {status} for url ({url})")));
        }

        tracing::debug!(%status, len = ?response.content_length(), "receiving body");

        Ok(response.bytes()?.to_vec())
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &str, destination: &Path, timeout: Duration) -> FetchOutcome {
        let span = tracing::info_span!("fetch", url, ?destination);
        let _guard = span.enter();

        tracing::info!("downloading");

        let body = match self.download(url, timeout) {
            Ok(body) => body,
            Err(error) if error.is_timeout() => {
                tracing::error!(timeout_secs = timeout.as_secs_f64(), "download timed out");
                return FetchOutcome::TimedOut;
            }
            Err(error) => {
                let message = format_error(error);
                tracing::error!(error = %message, "error during download");
                return FetchOutcome::TransportError(message);
            }
        };

        match crate::os::write_atomic(destination, &body) {
            Ok(()) => {
                tracing::info!(len = body.len(), "download & write successful");
                FetchOutcome::Success
            }
            Err(error) => {
                let message = format_error(error);
                tracing::error!(error = %message, "could not write download");
                FetchOutcome::UnexpectedError(message)
            }
        }
    }
}
