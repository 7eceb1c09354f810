//! GitHub REST API client for releases.
//!
//! Uses the blocking reqwest client. Requests are authenticated with a bearer
//! token when one is configured, which raises the rate limit from 60 to 5000
//! requests per hour.

use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, LOCATION, USER_AGENT};
use reqwest::redirect::Policy;
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use tracing::{debug, warn};

use super::source::ReleaseSource;
use super::types::{AssetStream, RateLimit, Release};
use crate::error::{InstallError, InstallResult};

/// Default API endpoint.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Timeout for establishing connections.
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;

/// Typical authenticated rate limit per hour.
const AUTHENTICATED_LIMIT: u64 = 5000;

/// Maximum redirects followed when fetching asset bytes.
const MAX_REDIRECTS: usize = 10;

/// Settings for [`GitHubClient`].
#[derive(Debug, Clone)]
pub struct GitHubConfig {
    /// Base API URL, without a trailing slash.
    pub api_url: String,
    /// Personal access token.
    pub token: Option<String>,
    /// Overall request timeout. `None` lets large downloads run unbounded.
    pub timeout: Option<Duration>,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            token: None,
            timeout: None,
        }
    }
}

impl GitHubConfig {
    /// Set the API base URL.
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the access token.
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.is_empty());
        self
    }

    /// Set the overall request timeout.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Release source backed by the GitHub REST API.
#[derive(Debug)]
pub struct GitHubClient {
    client: Client,
    api_url: Url,
    authenticated: bool,
}

impl GitHubClient {
    /// Create a client from the given settings.
    pub fn new(config: GitHubConfig) -> InstallResult<Self> {
        let api_url = Url::parse(&config.api_url)
            .map_err(|e| InstallError::Config(format!("invalid API URL '{}': {}", config.api_url, e)))?;
        if api_url.cannot_be_a_base() {
            return Err(InstallError::Config(format!(
                "invalid API URL '{}': not a base URL",
                config.api_url
            )));
        }

        let mut headers = HeaderMap::new();
        let agent = format!("gh-install/{}", env!("CARGO_PKG_VERSION"));
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&agent).map_err(|e| InstallError::Config(e.to_string()))?,
        );
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );

        let authenticated = config.token.is_some();
        if let Some(token) = &config.token {
            debug!("Using GitHub token for authentication");
            let mut value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|e| InstallError::Config(format!("invalid GitHub token: {}", e)))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        } else {
            debug!("No GitHub token configured, using unauthenticated requests (lower rate limit)");
        }

        let client = Client::builder()
            .default_headers(headers)
            .connect_timeout(Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS))
            .timeout(config.timeout)
            .redirect(Policy::limited(MAX_REDIRECTS))
            .build()?;

        Ok(Self {
            client,
            api_url,
            authenticated,
        })
    }

    /// Whether requests carry a token.
    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    /// API URL with each segment appended and percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> String {
        let mut url = self.api_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url.to_string()
    }

    fn repo_url(&self, owner: &str, repo: &str, path: &[&str]) -> String {
        let mut segments = vec!["repos", owner, repo];
        segments.extend_from_slice(path);
        self.endpoint(&segments)
    }

    fn send(&self, request: RequestBuilder, url: &str) -> InstallResult<Response> {
        request.send().map_err(|e| {
            InstallError::Http(format!("request to {} failed: {}", url, e))
        })
    }

    fn get_release(&self, url: &str, what: String) -> InstallResult<Release> {
        debug!(url, "Fetching release metadata");
        let response = self.send(self.client.get(url), url)?;
        let response = check_status(response, url, what)?;
        response
            .json::<Release>()
            .map_err(|e| InstallError::Http(format!("invalid release payload from {}: {}", url, e)))
    }
}

impl ReleaseSource for GitHubClient {
    fn latest_release(&self, owner: &str, repo: &str) -> InstallResult<Release> {
        let url = self.repo_url(owner, repo, &["releases", "latest"]);
        self.get_release(
            &url,
            format!("repository {}/{} or its latest release", owner, repo),
        )
    }

    fn release_by_tag(&self, owner: &str, repo: &str, tag: &str) -> InstallResult<Release> {
        let url = self.repo_url(owner, repo, &["releases", "tags", tag]);
        self.get_release(
            &url,
            format!("release with tag '{}' in {}/{}", tag, owner, repo),
        )
    }

    fn download_asset(&self, owner: &str, repo: &str, asset_id: u64) -> InstallResult<AssetStream> {
        let id = asset_id.to_string();
        let url = self.repo_url(owner, repo, &["releases", "assets", &id]);
        debug!(url, "Requesting asset bytes");

        let request = self
            .client
            .get(&url)
            .header(ACCEPT, HeaderValue::from_static("application/octet-stream"));
        let response = self.send(request, &url)?;

        if response.status().is_redirection() {
            let location = response
                .headers()
                .get(LOCATION)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string();
            return Ok(AssetStream::Redirect(location));
        }

        let response = check_status(response, &url, format!("asset {} in {}/{}", asset_id, owner, repo))?;
        Ok(AssetStream::Bytes(Box::new(response)))
    }

    fn rate_limit(&self) -> InstallResult<Option<RateLimit>> {
        let url = self.endpoint(&["rate_limit"]);
        let response = self.send(self.client.get(&url), &url)?;
        let response = check_status(response, &url, "rate limit endpoint".to_string())?;
        let body: RateLimitResponse = response
            .json()
            .map_err(|e| InstallError::Http(format!("invalid rate limit payload: {}", e)))?;
        Ok(Some(body.resources.core.into()))
    }
}

/// Log the current rate limit at debug level.
///
/// Lookup failures are logged and otherwise ignored.
pub fn log_rate_limit<S: ReleaseSource + ?Sized>(source: &S) {
    match source.rate_limit() {
        Ok(Some(rate)) => {
            let reset = chrono::DateTime::from_timestamp(rate.reset, 0)
                .map(|t| t.with_timezone(&chrono::Local).format("%H:%M:%S").to_string())
                .unwrap_or_else(|| rate.reset.to_string());
            debug!(
                remaining = rate.remaining,
                limit = rate.limit,
                reset = %reset,
                authenticated = rate.limit >= AUTHENTICATED_LIMIT,
                "GitHub API rate limit"
            );
        }
        Ok(None) => debug!("Rate limit info unavailable"),
        Err(e) => debug!(error = %e, "Could not retrieve rate limits"),
    }
}

/// Map an error status onto the install error taxonomy.
fn check_status(response: Response, url: &str, what: String) -> InstallResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    if status == StatusCode::NOT_FOUND {
        return Err(InstallError::ReleaseNotFound { what });
    }

    let headers = response.headers();
    let remaining = header_u64(headers, "x-ratelimit-remaining");
    if matches!(status, StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS) && remaining == Some(0)
    {
        let reset = header_u64(headers, "x-ratelimit-reset")
            .and_then(|ts| chrono::DateTime::from_timestamp(ts as i64, 0))
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| "unknown".to_string());
        warn!(url, reset = %reset, "GitHub API rate limit exhausted");
        return Err(InstallError::RateLimited { reset });
    }

    let message = response
        .json::<ApiErrorBody>()
        .map(|body| body.message)
        .unwrap_or_else(|_| status.canonical_reason().unwrap_or("unknown error").to_string());
    Err(InstallError::Api {
        url: url.to_string(),
        status: status.as_u16(),
        message,
    })
}

fn header_u64(headers: &HeaderMap, name: &str) -> Option<u64> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse::<u64>().ok())
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

#[derive(Debug, Deserialize)]
struct RateLimitResponse {
    resources: RateLimitResources,
}

#[derive(Debug, Deserialize)]
struct RateLimitResources {
    core: RateLimitEntry,
}

#[derive(Debug, Deserialize)]
struct RateLimitEntry {
    limit: u64,
    remaining: u64,
    reset: i64,
}

impl From<RateLimitEntry> for RateLimit {
    fn from(entry: RateLimitEntry) -> Self {
        Self {
            limit: entry.limit,
            remaining: entry.remaining,
            reset: entry.reset,
        }
    }
}
