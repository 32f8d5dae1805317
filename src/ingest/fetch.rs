// src/ingest/fetch.rs
use async_trait::async_trait;
use reqwest::{redirect, Client};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::error::FetchError;
use crate::ingest::feed::parse_feed;
use crate::ingest::types::{FetchedPage, RawContent, SourceConfig, SourceKind};

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Outbound HTTP used by both the source fetcher and the link resolver.
#[async_trait]
pub trait PageClient: Send + Sync {
    /// GET `url`, following redirects. Non-2xx is an error.
    async fn get_page(&self, url: &str) -> Result<FetchedPage, FetchError>;

    /// One HEAD request following the redirect chain; returns the final URL.
    async fn follow_redirects(&self, url: &str) -> Result<String, FetchError>;
}

/// `reqwest`-backed client with a per-call timeout and a browser-like UA.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    pub fn new(user_agent: &str, timeout: Duration) -> reqwest::Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .redirect(redirect::Policy::limited(10))
            .build()?;
        Ok(Self { client })
    }
}

fn transport(url: &str, e: reqwest::Error) -> FetchError {
    FetchError::Transport {
        url: url.to_string(),
        reason: e.to_string(),
    }
}

#[async_trait]
impl PageClient for HttpClient {
    async fn get_page(&self, url: &str) -> Result<FetchedPage, FetchError> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| transport(url, e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let final_url = resp.url().to_string();
        let body = resp.text().await.map_err(|e| transport(url, e))?;
        Ok(FetchedPage { body, final_url })
    }

    async fn follow_redirects(&self, url: &str) -> Result<String, FetchError> {
        let resp = self
            .client
            .head(url)
            .send()
            .await
            .map_err(|e| transport(url, e))?;
        Ok(resp.url().to_string())
    }
}

/// In-memory client serving canned pages. Records every request so tests can
/// assert which URLs were touched.
#[derive(Default, Clone)]
pub struct FixtureClient {
    pages: HashMap<String, FixtureResponse>,
    redirects: HashMap<String, String>,
    requests: Arc<Mutex<Vec<String>>>,
}

#[derive(Debug, Clone)]
enum FixtureResponse {
    Page(FetchedPage),
    Status(u16),
    Down,
}

impl FixtureClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` at `url` with no redirect.
    pub fn with_page(self, url: &str, body: &str) -> Self {
        self.with_redirected_page(url, url, body)
    }

    /// Serve `body` at `url`, reporting `final_url` as the post-redirect address.
    pub fn with_redirected_page(mut self, url: &str, final_url: &str, body: &str) -> Self {
        self.pages.insert(
            url.to_string(),
            FixtureResponse::Page(FetchedPage {
                body: body.to_string(),
                final_url: final_url.to_string(),
            }),
        );
        self
    }

    pub fn with_status(mut self, url: &str, status: u16) -> Self {
        self.pages
            .insert(url.to_string(), FixtureResponse::Status(status));
        self
    }

    /// Any request to `url` fails at the transport level.
    pub fn with_unreachable(mut self, url: &str) -> Self {
        self.pages.insert(url.to_string(), FixtureResponse::Down);
        self
    }

    /// A HEAD on `from` lands on `to`.
    pub fn with_redirect(mut self, from: &str, to: &str) -> Self {
        self.redirects.insert(from.to_string(), to.to_string());
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().map(|v| v.clone()).unwrap_or_default()
    }

    fn record(&self, what: String) {
        if let Ok(mut v) = self.requests.lock() {
            v.push(what);
        }
    }
}

#[async_trait]
impl PageClient for FixtureClient {
    async fn get_page(&self, url: &str) -> Result<FetchedPage, FetchError> {
        self.record(format!("GET {url}"));
        match self.pages.get(url) {
            Some(FixtureResponse::Page(p)) => Ok(p.clone()),
            Some(FixtureResponse::Status(s)) => Err(FetchError::Status {
                url: url.to_string(),
                status: *s,
            }),
            Some(FixtureResponse::Down) | None => Err(FetchError::Transport {
                url: url.to_string(),
                reason: "connection refused".to_string(),
            }),
        }
    }

    async fn follow_redirects(&self, url: &str) -> Result<String, FetchError> {
        self.record(format!("HEAD {url}"));
        if matches!(self.pages.get(url), Some(FixtureResponse::Down)) {
            return Err(FetchError::Transport {
                url: url.to_string(),
                reason: "connection refused".to_string(),
            });
        }
        Ok(self
            .redirects
            .get(url)
            .cloned()
            .unwrap_or_else(|| url.to_string()))
    }
}

/// Retrieves the raw content of one source.
pub struct SourceFetcher {
    client: Arc<dyn PageClient>,
}

impl SourceFetcher {
    pub fn new(client: Arc<dyn PageClient>) -> Self {
        Self { client }
    }

    pub async fn fetch(&self, source: &SourceConfig) -> Result<RawContent, FetchError> {
        let page = self.client.get_page(&source.fetch_url).await?;
        match source.kind {
            SourceKind::Feed => {
                let entries = parse_feed(&page.body).map_err(|reason| FetchError::Parse {
                    url: source.fetch_url.clone(),
                    expected: "feed",
                    reason,
                })?;
                Ok(RawContent::Feed(entries))
            }
            SourceKind::HtmlListing => {
                if page.body.trim().is_empty() {
                    return Err(FetchError::Parse {
                        url: source.fetch_url.clone(),
                        expected: "html listing",
                        reason: "empty body".to_string(),
                    });
                }
                Ok(RawContent::Page(page))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(kind: SourceKind) -> SourceConfig {
        SourceConfig {
            name: "Board".into(),
            fetch_url: "https://board.example/feed".into(),
            kind,
            site_domain: "board.example".into(),
            enabled: true,
            selectors: None,
        }
    }

    #[tokio::test]
    async fn non_success_status_is_fetch_error() {
        let client = FixtureClient::new().with_status("https://board.example/feed", 503);
        let f = SourceFetcher::new(Arc::new(client));
        let err = f.fetch(&source(SourceKind::Feed)).await.unwrap_err();
        assert_eq!(
            err,
            FetchError::Status {
                url: "https://board.example/feed".into(),
                status: 503
            }
        );
    }

    #[tokio::test]
    async fn garbage_feed_is_parse_error() {
        let client = FixtureClient::new().with_page("https://board.example/feed", "not xml at all");
        let f = SourceFetcher::new(Arc::new(client));
        let err = f.fetch(&source(SourceKind::Feed)).await.unwrap_err();
        assert!(matches!(err, FetchError::Parse { expected: "feed", .. }));
    }

    #[tokio::test]
    async fn listing_keeps_final_url() {
        let client = FixtureClient::new().with_redirected_page(
            "https://board.example/feed",
            "https://www.board.example/jobs",
            "<html><body>jobs</body></html>",
        );
        let f = SourceFetcher::new(Arc::new(client));
        match f.fetch(&source(SourceKind::HtmlListing)).await.unwrap() {
            RawContent::Page(p) => assert_eq!(p.final_url, "https://www.board.example/jobs"),
            other => panic!("unexpected {other:?}"),
        }
    }
}
