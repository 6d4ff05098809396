use reqwest::StatusCode;
use thiserror::Error;

/// Everything that can go wrong while retrieving a single thread page.
///
/// A `ScrapeError` is always scoped to one url, a batch keeps going after
/// one of these.
#[derive(Error, Debug)]
pub enum ScrapeError {
    /// Failed to get a response.
    #[error("Request to {url} failed: {error}")]
    HttpRequestFailure {
        /// The requested url.
        url: String,
        /// The reqwest error.
        error: reqwest::Error,
    },
    /// Received a response, but not a 2xx one.
    #[error("Expected a 2xx Success from {url} but got: {status}")]
    NoHttpSuccess {
        /// The requested url.
        url: String,
        /// Statuscode of the error response.
        status: StatusCode,
    },
    /// Received a success response but could not read its body.
    #[error("Failed to read response body of {url}: {error}")]
    ReadBody {
        /// The requested url.
        url: String,
        /// The reqwest error.
        error: reqwest::Error,
    },
    /// Any other failure reported by a custom fetcher.
    #[error("Failed to fetch {url}: {reason}")]
    Other {
        /// The requested url.
        url: String,
        /// Human readable cause.
        reason: String,
    },
}

impl ScrapeError {
    /// The url the failed request was made for.
    pub fn url(&self) -> &str {
        match self {
            ScrapeError::HttpRequestFailure { url, .. }
            | ScrapeError::NoHttpSuccess { url, .. }
            | ScrapeError::ReadBody { url, .. }
            | ScrapeError::Other { url, .. } => url,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_carries_url() {
        let err = ScrapeError::NoHttpSuccess {
            url: "https://www.dell.com/community/en/conversations/x//1".to_string(),
            status: StatusCode::NOT_FOUND,
        };
        assert_eq!(
            err.url(),
            "https://www.dell.com/community/en/conversations/x//1"
        );
        assert!(err.to_string().contains("404"));
    }
}
