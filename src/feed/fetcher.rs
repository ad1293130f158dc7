use futures::StreamExt;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::StatusCode;
use std::time::Duration;
use thiserror::Error;

use super::model::Feed;
use super::parser::parse_feed;

/// Feeds larger than this are rejected.
pub const MAX_FEED_SIZE: usize = 10 * 1024 * 1024; // 10MB
/// Article pages larger than this are rejected.
pub const MAX_PAGE_SIZE: usize = 5 * 1024 * 1024; // 5MB

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors that can occur while fetching a feed or an article page.
///
/// Covers the full lifecycle of one request: transport failure, unexpected
/// status, oversized body, and failure to make sense of what came back.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS, connection, TLS, proxy, gzip stream, etc.)
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),
    /// Request exceeded the configured per-request timeout
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),
    /// HTTP response with a status the caller does not accept
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Response body exceeded the size limit
    #[error("Response too large (exceeds {0} bytes)")]
    ResponseTooLarge(usize),
    /// Feed or page could not be parsed
    #[error("Parse error: {0}")]
    Parse(String),
    /// The article selector matched nothing on the page
    #[error("Nothing matched the selector")]
    NoMatch,
    /// The item carries no link to fetch
    #[error("Item has no link")]
    MissingLink,
    /// The configured user agent or proxy could not be used
    #[error("Invalid client setting: {0}")]
    InvalidSetting(String),
}

/// Which statuses count as success for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusPolicy {
    /// Only `200 OK`. Used for feeds and article pages.
    OkOnly,
    /// `200 OK` or `304 Not Modified`. Used by the raw download utility.
    OkOrNotModified,
}

impl StatusPolicy {
    fn accepts(self, status: StatusCode) -> bool {
        match self {
            StatusPolicy::OkOnly => status == StatusCode::OK,
            StatusPolicy::OkOrNotModified => {
                status == StatusCode::OK || status == StatusCode::NOT_MODIFIED
            }
        }
    }
}

/// HTTP client that presents itself as a browser navigating to each page.
///
/// Cheap to clone: the underlying `reqwest::Client` is reference counted.
/// Gzip bodies are decoded transparently when the server declares
/// `content-encoding: gzip`.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    user_agent: HeaderValue,
    timeout: Duration,
}

impl HttpClient {
    /// Builds a client.
    ///
    /// `proxy` accepts `http://`, `https://`, `socks5://` and `socks5h://`
    /// URLs. Without one, reqwest's environment proxy settings apply.
    pub fn new(user_agent: &str, timeout: Duration, proxy: Option<&str>) -> Result<Self, FetchError> {
        let user_agent = HeaderValue::from_str(user_agent)
            .map_err(|e| FetchError::InvalidSetting(format!("user agent: {e}")))?;

        let mut builder = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT.min(timeout))
            .pool_idle_timeout(timeout)
            .gzip(true);

        if let Some(proxy) = proxy {
            let proxy = reqwest::Proxy::all(proxy)
                .map_err(|e| FetchError::InvalidSetting(format!("proxy '{proxy}': {e}")))?;
            builder = builder.proxy(proxy);
        }

        Ok(Self {
            client: builder.build()?,
            user_agent,
            timeout,
        })
    }

    /// GETs `url` and returns the (decoded) body.
    ///
    /// The timeout covers the whole exchange, body included. A timeout only
    /// fails this request; nothing else is cancelled.
    pub async fn get_bytes(
        &self,
        url: &str,
        policy: StatusPolicy,
        limit: usize,
    ) -> Result<Vec<u8>, FetchError> {
        let request = self.client.get(url).headers(browser_headers(url, &self.user_agent));

        let exchange = async {
            let response = request.send().await.map_err(FetchError::Transport)?;

            if !policy.accepts(response.status()) {
                return Err(FetchError::HttpStatus(response.status().as_u16()));
            }

            read_limited_bytes(response, limit).await
        };

        tokio::time::timeout(self.timeout, exchange)
            .await
            .map_err(|_| FetchError::Timeout(self.timeout))?
    }

    /// GETs `url` and decodes the body as UTF-8, replacing invalid sequences.
    pub async fn get_text(
        &self,
        url: &str,
        policy: StatusPolicy,
        limit: usize,
    ) -> Result<String, FetchError> {
        let bytes = self.get_bytes(url, policy, limit).await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// Fetches and parses the source feed.
///
/// Every failure here is fatal to the run: transport errors, any status
/// other than 200, and bodies that are neither RSS nor Atom.
pub async fn fetch_feed(client: &HttpClient, url: &str) -> Result<Feed, FetchError> {
    let bytes = client
        .get_bytes(url, StatusPolicy::OkOnly, MAX_FEED_SIZE)
        .await?;

    let feed = parse_feed(&bytes).map_err(|e| FetchError::Parse(e.to_string()))?;
    tracing::info!(url = %url, items = feed.items.len(), "Fetched feed");
    Ok(feed)
}

/// Headers a browser sends when the user follows a link to `url`.
///
/// The page is its own referer, caching is disabled, and the privacy
/// signals (GPC, DNT) are set.
fn browser_headers(url: &str, user_agent: &HeaderValue) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(header::USER_AGENT, user_agent.clone());
    headers.insert(
        header::ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8",
        ),
    );
    headers.insert(
        header::ACCEPT_LANGUAGE,
        HeaderValue::from_static("en-US,en;q=0.5"),
    );
    headers.insert(header::ACCEPT_ENCODING, HeaderValue::from_static("gzip"));
    if let Ok(referer) = HeaderValue::from_str(url) {
        headers.insert(header::REFERER, referer);
    }
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
    headers.insert(header::DNT, HeaderValue::from_static("1"));
    headers.insert(
        header::UPGRADE_INSECURE_REQUESTS,
        HeaderValue::from_static("1"),
    );
    headers.insert("sec-gpc", HeaderValue::from_static("1"));
    headers.insert("sec-fetch-dest", HeaderValue::from_static("document"));
    headers.insert("sec-fetch-mode", HeaderValue::from_static("navigate"));
    headers.insert("sec-fetch-site", HeaderValue::from_static("same-origin"));
    headers.insert("sec-fetch-user", HeaderValue::from_static("?1"));
    headers
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, FetchError> {
    // Fast path: check Content-Length header
    if let Some(len) = response.content_length() {
        if len as usize > limit {
            return Err(FetchError::ResponseTooLarge(limit));
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(FetchError::Transport)?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(FetchError::ResponseTooLarge(limit));
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(bytes)
}
