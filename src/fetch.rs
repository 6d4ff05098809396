use anyhow::{Context, Result};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::Client;

use crate::community::Config;
use crate::error::ScrapeError;

/// Retrieves the raw markup behind a url.
#[allow(async_fn_in_trait)]
pub trait Fetch {
    /// GET `url` and return the response body.
    ///
    /// Transport failures and non 2xx responses are reported as
    /// [`ScrapeError`].
    async fn fetch(&self, url: &str) -> std::result::Result<String, ScrapeError>;
}

/// [`Fetch`] over http(s) with a shared [`reqwest::Client`].
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: &Config) -> Result<Self> {
        let mut headers = HeaderMap::with_capacity(1);
        headers.insert(
            USER_AGENT,
            config
                .browser_user_agent
                .parse::<HeaderValue>()
                .context("Failed to parse user agent header.")?,
        );

        let client = Client::builder()
            .timeout(config.request_timeout)
            .default_headers(headers)
            .build()
            .context("Failed to build http client.")?;

        Ok(Self { client })
    }
}

impl Fetch for HttpFetcher {
    async fn fetch(&self, url: &str) -> std::result::Result<String, ScrapeError> {
        let resp = self.client.get(url).send().await.map_err(|error| {
            ScrapeError::HttpRequestFailure {
                url: url.to_string(),
                error,
            }
        })?;

        if !resp.status().is_success() {
            return Err(ScrapeError::NoHttpSuccess {
                url: url.to_string(),
                status: resp.status(),
            });
        }

        resp.text().await.map_err(|error| ScrapeError::ReadBody {
            url: url.to_string(),
            error,
        })
    }
}
