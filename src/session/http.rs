//! Reqwest-backed catalog session
//!
//! This module handles the HTTP side of a session:
//! - Building one HTTP client per identity (user agent, timeouts, proxy)
//! - Loading pages and classifying HTTP-level failures
//! - Emulating catalog controls by following the catalog's own URLs
//!
//! Everything about markup is delegated to the catalog module.

use crate::catalog::{self, Extract, Extracted};
use crate::config::CatalogConfig;
use crate::session::{Browser, Condition, Control, ProxyIdentity, Session, Target};
use crate::OpFailure;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tokio::time::Instant;
use url::Url;

const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Launches reqwest sessions bound to a proxy identity
#[derive(Debug, Clone)]
pub struct HttpBrowser {
    user_agent: String,
    request_timeout: Duration,
}

impl HttpBrowser {
    pub fn new(config: &CatalogConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            request_timeout: Duration::from_millis(config.wait_timeout_ms),
        }
    }
}

/// Builds an HTTP client routed through the given identity
///
/// # Arguments
///
/// * `user_agent` - The User-Agent header to send
/// * `timeout` - Overall request timeout
/// * `identity` - The proxy to route through; direct if it has no server
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Invalid proxy URL or client setup failure
pub fn build_http_client(
    user_agent: &str,
    timeout: Duration,
    identity: &ProxyIdentity,
) -> Result<Client, reqwest::Error> {
    let mut builder = Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .gzip(true)
        .brotli(true)
        .danger_accept_invalid_certs(true);

    if let Some(server) = &identity.server {
        let mut proxy = reqwest::Proxy::all(server.as_str())?;
        if let Some(username) = &identity.username {
            proxy = proxy.basic_auth(username, identity.password.as_deref().unwrap_or(""));
        }
        builder = builder.proxy(proxy);
    } else {
        builder = builder.no_proxy();
    }

    builder.build()
}

#[async_trait(?Send)]
impl Browser for HttpBrowser {
    type Session = HttpSession;

    async fn launch(&mut self, identity: &ProxyIdentity) -> Result<HttpSession, OpFailure> {
        let client = build_http_client(&self.user_agent, self.request_timeout, identity)
            .map_err(|e| {
                OpFailure::Unrecoverable(format!("cannot build client for {}: {}", identity, e))
            })?;

        Ok(HttpSession {
            client,
            current_url: None,
            body: None,
        })
    }
}

/// One reqwest client and the page it last loaded
pub struct HttpSession {
    client: Client,
    current_url: Option<Url>,
    body: Option<String>,
}

impl HttpSession {
    /// The URL of the current page, after redirects
    pub fn current_url(&self) -> Option<&Url> {
        self.current_url.as_ref()
    }

    fn page(&self) -> Result<(&Url, &str), OpFailure> {
        match (&self.current_url, &self.body) {
            (Some(url), Some(body)) => Ok((url, body.as_str())),
            _ => Err(OpFailure::Unexpected("no page loaded".to_string())),
        }
    }

    async fn reload(&mut self) -> Result<(), OpFailure> {
        let (url, _) = self.page()?;
        let url = url.clone();
        self.navigate(&url).await
    }
}

/// Maps an HTTP status onto a page failure
///
/// | Status | Failure |
/// |--------|---------|
/// | 403, 429 | Blocked |
/// | 5xx | ServerError |
/// | other non-2xx | Unexpected |
fn classify_status(status: StatusCode) -> Option<OpFailure> {
    if status == StatusCode::FORBIDDEN || status == StatusCode::TOO_MANY_REQUESTS {
        Some(OpFailure::Blocked)
    } else if status.is_server_error() {
        Some(OpFailure::ServerError)
    } else if !status.is_success() {
        Some(OpFailure::Unexpected(format!("HTTP {}", status.as_u16())))
    } else {
        None
    }
}

fn classify_transport(error: reqwest::Error, url: &Url) -> OpFailure {
    if error.is_timeout() {
        OpFailure::Timeout(url.to_string())
    } else if error.is_connect() {
        OpFailure::Network(format!("connection refused: {}", url))
    } else {
        OpFailure::Network(error.to_string())
    }
}

#[async_trait(?Send)]
impl Session for HttpSession {
    async fn navigate(&mut self, url: &Url) -> Result<(), OpFailure> {
        tracing::debug!("GET {}", url);

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| classify_transport(e, url))?;

        if let Some(failure) = classify_status(response.status()) {
            return Err(failure);
        }

        let final_url = response.url().clone();
        let body = response
            .text()
            .await
            .map_err(|e| classify_transport(e, url))?;

        self.current_url = Some(final_url);
        self.body = Some(body);
        Ok(())
    }

    async fn wait_for(
        &mut self,
        condition: &Condition,
        timeout: Duration,
    ) -> Result<(), OpFailure> {
        let target = match condition {
            Condition::Loaded => {
                return self.page().map(|_| ()).map_err(|_| {
                    OpFailure::Timeout("page load".to_string())
                })
            }
            Condition::Present(target) => target,
        };

        let deadline = Instant::now() + timeout;
        loop {
            if self.locate(target).await? {
                return Ok(());
            }
            if Instant::now() + POLL_INTERVAL > deadline {
                return Err(OpFailure::Timeout(target.to_string()));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
            self.reload().await?;
        }
    }

    async fn locate(&mut self, target: &Target) -> Result<bool, OpFailure> {
        match &self.body {
            Some(body) => Ok(catalog::is_present(body, target)),
            None => Ok(false),
        }
    }

    async fn activate(&mut self, control: &Control) -> Result<(), OpFailure> {
        let (current, body) = self.page()?;

        let next = match control {
            // The categories panel is part of the entity page
            Control::ShowCategories => return Ok(()),
            Control::ChooseCategory(id) => catalog::category_url(current, id),
            Control::GotoPage(page) => catalog::page_url(current, *page),
            Control::NextPage => {
                let href = catalog::next_page_href(body).ok_or_else(|| {
                    OpFailure::Unexpected("no next page control".to_string())
                })?;
                current
                    .join(&href)
                    .map_err(|e| OpFailure::Unexpected(format!("bad next page link: {}", e)))?
            }
            Control::SearchTitle(code) => catalog::set_query_param(current, "titlename", code),
        };

        self.navigate(&next).await
    }

    async fn extract(&mut self, request: Extract) -> Result<Extracted, OpFailure> {
        let (_, body) = self.page()?;

        Ok(match request {
            Extract::Categories => Extracted::Categories(catalog::extract_categories(body)),
            Extract::Publications => Extracted::Publications(catalog::extract_publications(body)),
            Extract::TitleLinks => Extracted::TitleLinks(catalog::extract_title_links(body)),
        })
    }

    async fn close(&mut self) {
        self.current_url = None;
        self.body = None;
    }
}
