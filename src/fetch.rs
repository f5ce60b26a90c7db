use std::time::{Duration, Instant};

use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::settings::Settings;

const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("not a shared conversation URL: {0}")]
    InvalidUrl(String),
    #[error("failed to fetch conversation: {status}")]
    Status { status: StatusCode },
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

impl FetchError {
    pub fn suggestion(&self) -> &'static str {
        match self {
            Self::InvalidUrl(_) => "Pass the link of a shared conversation page.",
            Self::Status { .. } => {
                "The share page may require authentication or be protected. Try copying the text manually."
            }
            Self::Transport(_) => {
                "Please try copying and pasting the conversation text manually instead."
            }
        }
    }
}

/// What the page fetch produced, for the caller to hand to the matching extractor.
#[derive(Debug)]
pub enum FetchedPage {
    Document(Value),
    Markup(String),
}

pub struct PageFetcher {
    client: reqwest::Client,
    url_marker: String,
    max_retries: u32,
    backoff: Duration,
}

impl PageFetcher {
    pub fn new(settings: &Settings) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(browser_headers())
            .timeout(settings.fetch_timeout())
            .build()?;

        Ok(Self {
            client,
            url_marker: settings.share_url_marker.clone(),
            max_retries: settings.max_retries,
            backoff: settings.retry_backoff(),
        })
    }

    pub fn validate(&self, url: &str) -> Result<(), FetchError> {
        let is_http = url.starts_with("https://") || url.starts_with("http://");
        if !is_http || !url.contains(&self.url_marker) {
            return Err(FetchError::InvalidUrl(url.to_string()));
        }
        Ok(())
    }

    /// Fetch a share page, retrying rate limits and server errors with exponential backoff.
    pub async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        self.validate(url)?;

        for attempt in 0..self.max_retries {
            match self.fetch_once(url).await {
                Err(FetchError::Status { status }) if is_retryable(status) => {
                    let backoff = backoff_for(self.backoff, attempt);
                    warn!(
                        "Got {} from {} (attempt {}/{}), backing off {:.1}s",
                        status,
                        url,
                        attempt + 1,
                        self.max_retries,
                        backoff.as_secs_f64()
                    );
                    tokio::time::sleep(backoff).await;
                }
                other => return other,
            }
        }

        self.fetch_once(url).await
    }

    async fn fetch_once(&self, url: &str) -> Result<FetchedPage, FetchError> {
        info!("Fetching: {}", url);
        let start = Instant::now();
        let response = self.client.get(url).send().await?;
        let status = response.status();
        debug!("{} answered {} in {}ms", url, status, start.elapsed().as_millis());

        if !status.is_success() {
            return Err(FetchError::Status { status });
        }

        let is_json = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.contains("json"));
        let body = response.text().await?;

        Ok(classify_body(body, is_json))
    }
}

/// JSON bodies become documents; a JSON content type that fails to decode is kept as markup.
fn classify_body(body: String, is_json: bool) -> FetchedPage {
    if is_json {
        match serde_json::from_str(&body) {
            Ok(doc) => return FetchedPage::Document(doc),
            Err(e) => debug!("JSON response did not decode: {}", e),
        }
    }
    FetchedPage::Markup(body)
}

/// `base * 2^attempt`, saturating instead of overflowing on large retry counts.
fn backoff_for(base: Duration, attempt: u32) -> Duration {
    let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
    base.saturating_mul(factor)
}

fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
        ),
    );
    headers.insert(header::ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));
    headers.insert(header::DNT, HeaderValue::from_static("1"));
    headers.insert(header::UPGRADE_INSECURE_REQUESTS, HeaderValue::from_static("1"));
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("max-age=0"));
    headers
}
