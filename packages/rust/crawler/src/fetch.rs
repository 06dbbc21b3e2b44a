//! Page retrieval.
//!
//! [`PageFetcher`] is the seam the traversal fetches through; [`HttpFetcher`]
//! is the `reqwest` implementation used by the CLI.

use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, instrument, warn};
use url::Url;

use personlink_shared::{PersonLinkError, Result, TraversalConfig};

/// Fetches the raw body of a page.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Return the body of `url`. Network failures and non-success statuses
    /// are [`PersonLinkError::Network`].
    async fn fetch(&self, url: &Url) -> Result<String>;
}

#[async_trait]
impl<F: PageFetcher + ?Sized> PageFetcher for std::sync::Arc<F> {
    async fn fetch(&self, url: &Url) -> Result<String> {
        (**self).fetch(url).await
    }
}

// ---------------------------------------------------------------------------
// HttpFetcher
// ---------------------------------------------------------------------------

/// Sequential HTTP fetcher with a politeness delay and SSRF guard.
pub struct HttpFetcher {
    client: Client,
    rate_limit: Duration,
    /// Allow localhost/private IPs (for tests against mock servers).
    allow_localhost: bool,
}

impl HttpFetcher {
    /// Create a fetcher from the runtime traversal configuration.
    pub fn new(config: &TraversalConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .redirect(reqwest::redirect::Policy::limited(5))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| PersonLinkError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            rate_limit: Duration::from_millis(config.rate_limit_ms),
            allow_localhost: false,
        })
    }

    /// Allow fetching localhost/private IPs (for integration tests).
    pub fn allow_localhost(mut self) -> Self {
        self.allow_localhost = true;
        self
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    #[instrument(skip_all, fields(url = %url))]
    async fn fetch(&self, url: &Url) -> Result<String> {
        if !self.allow_localhost && is_ssrf_target(url) {
            warn!("SSRF protection: blocked");
            return Err(PersonLinkError::Network(format!("{url}: blocked target")));
        }

        if !self.rate_limit.is_zero() {
            tokio::time::sleep(self.rate_limit).await;
        }

        debug!("fetching page");
        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| PersonLinkError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PersonLinkError::Network(format!("{url}: HTTP {status}")));
        }

        response
            .text()
            .await
            .map_err(|e| PersonLinkError::Network(format!("{url}: body read failed: {e}")))
    }
}

// ---------------------------------------------------------------------------
// SSRF protection
// ---------------------------------------------------------------------------

/// Check if a URL targets a potentially dangerous resource.
fn is_ssrf_target(url: &Url) -> bool {
    match url.scheme() {
        "http" | "https" => {}
        _ => return true,
    }

    if let Some(host) = url.host_str() {
        if let Ok(ip) = host.trim_start_matches('[').trim_end_matches(']').parse::<IpAddr>() {
            return is_private_ip(&ip);
        }
        if host == "localhost" || host.ends_with(".local") || host.ends_with(".internal") {
            return true;
        }
    }

    false
}

/// Check if an IP is in a private/reserved range.
fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_broadcast()
                || v4.is_unspecified()
                // 100.64.0.0/10 (Carrier-grade NAT)
                || (v4.octets()[0] == 100 && (v4.octets()[1] & 0xC0) == 64)
        }
        IpAddr::V6(v6) => v6.is_loopback() || v6.is_unspecified(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> TraversalConfig {
        TraversalConfig {
            base_url: "https://en.wikipedia.org".into(),
            max_hops: 1,
            user_agent: "personlink-test".into(),
            timeout_secs: 5,
            rate_limit_ms: 0,
            exclude_patterns: vec![],
        }
    }

    #[test]
    fn ssrf_blocks_file_and_private_targets() {
        assert!(is_ssrf_target(&Url::parse("file:///etc/passwd").unwrap()));
        assert!(is_ssrf_target(&Url::parse("http://192.168.1.1/admin").unwrap()));
        assert!(is_ssrf_target(&Url::parse("http://127.0.0.1:8080/").unwrap()));
        assert!(is_ssrf_target(&Url::parse("http://[::1]/").unwrap()));
        assert!(is_ssrf_target(&Url::parse("http://localhost:3000/").unwrap()));
    }

    #[test]
    fn ssrf_allows_public() {
        let url = Url::parse("https://en.wikipedia.org/wiki/Michael_Jordan").unwrap();
        assert!(!is_ssrf_target(&url));
    }

    #[tokio::test]
    async fn fetches_body_from_mock_server() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/wiki/Alice"))
            .and(wiremock::matchers::header("user-agent", "personlink-test"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_string("<p>hi</p>"))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new(&test_config()).unwrap().allow_localhost();
        let url = Url::parse(&format!("{}/wiki/Alice", server.uri())).unwrap();
        let body = fetcher.fetch(&url).await.expect("fetch");
        assert_eq!(body, "<p>hi</p>");
    }

    #[tokio::test]
    async fn non_success_status_is_network_error() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::path("/wiki/Gone"))
            .respond_with(wiremock::ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new(&test_config()).unwrap().allow_localhost();
        let url = Url::parse(&format!("{}/wiki/Gone", server.uri())).unwrap();
        let err = fetcher.fetch(&url).await.unwrap_err();
        assert!(matches!(err, PersonLinkError::Network(_)));
        assert!(err.to_string().contains("404"));
    }

    #[tokio::test]
    async fn localhost_blocked_by_default() {
        let server = wiremock::MockServer::start().await;
        let fetcher = HttpFetcher::new(&test_config()).unwrap();
        let url = Url::parse(&server.uri()).unwrap();
        let err = fetcher.fetch(&url).await.unwrap_err();
        assert!(err.to_string().contains("blocked"));
    }
}
