use std::time::Duration;

use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::API_BASE_URL;
use crate::config::SettingsConfig;
use crate::error::{Error, Result};
use crate::types::{BetsQuery, PlaceBetRequest, PositionsQuery, SearchQuery, SellRequest};

/// Builder for [`ManifoldClient`].
#[derive(Debug, Clone)]
pub struct ManifoldClientBuilder {
    api_key: String,
    base_url: String,
    timeout: Option<Duration>,
}

impl ManifoldClientBuilder {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: API_BASE_URL.to_string(),
            timeout: None,
        }
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Per-request timeout. Without one a hung connection blocks indefinitely.
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn build(self) -> Result<ManifoldClient> {
        if self.api_key.trim().is_empty() {
            return Err(Error::MissingCredential);
        }

        let base_url = Url::parse(&self.base_url)
            .map_err(|e| Error::Config(format!("invalid base URL {:?}: {e}", self.base_url)))?;
        if base_url.cannot_be_a_base() {
            return Err(Error::Config(format!(
                "base URL {:?} cannot carry a path",
                self.base_url
            )));
        }

        let mut auth = HeaderValue::from_str(&format!("Key {}", self.api_key))
            .map_err(|_| Error::Config("API key contains invalid header characters".into()))?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, auth);
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );

        let mut builder = reqwest::Client::builder().default_headers(headers);
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(ManifoldClient { http, base_url })
    }
}

/// Authenticated client for the Manifold REST API.
///
/// Each method issues exactly one request and returns the response JSON
/// unchanged. Nothing is retried: POST endpoints are not idempotent.
#[derive(Debug, Clone)]
pub struct ManifoldClient {
    http: reqwest::Client,
    base_url: Url,
}

impl ManifoldClient {
    /// Client against the public API with no request timeout.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        ManifoldClientBuilder::new(api_key).build()
    }

    pub fn builder(api_key: impl Into<String>) -> ManifoldClientBuilder {
        ManifoldClientBuilder::new(api_key)
    }

    /// Client configured from the `[settings]` section of the config file.
    pub fn from_settings(api_key: impl Into<String>, settings: &SettingsConfig) -> Result<Self> {
        ManifoldClientBuilder::new(api_key)
            .base_url(settings.base_url.clone())
            .timeout(settings.timeout())
            .build()
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── Markets ────────────────────────────────────────────────────

    /// Search markets by free-text term. `GET /search-markets`
    pub async fn search_markets(&self, term: &str, limit: u32) -> Result<Vec<Value>> {
        let query = SearchQuery {
            term: term.to_string(),
            limit,
        };
        let req = self.request(Method::GET, &["search-markets"])?.query(&query);
        self.send(req).await
    }

    /// `GET /slug/{slug}`
    pub async fn get_market_by_slug(&self, slug: &str) -> Result<Value> {
        require("slug", slug)?;
        let req = self.request(Method::GET, &["slug", slug])?;
        self.send(req).await
    }

    /// Positions held in a market, ordered by profit or shares.
    /// `GET /market/{id}/positions`
    pub async fn get_market_positions(
        &self,
        market_id: &str,
        query: &PositionsQuery,
    ) -> Result<Vec<Value>> {
        require("market id", market_id)?;
        let req = self
            .request(Method::GET, &["market", market_id, "positions"])?
            .query(query);
        self.send(req).await
    }

    // ── Users ──────────────────────────────────────────────────────

    /// `GET /user/{username}`
    pub async fn get_user_by_username(&self, username: &str) -> Result<Value> {
        require("username", username)?;
        let req = self.request(Method::GET, &["user", username])?;
        self.send(req).await
    }

    /// Bets of the authenticated user, most recent first. `GET /bets`
    pub async fn get_my_bets(&self, query: &BetsQuery) -> Result<Vec<Value>> {
        let req = self.request(Method::GET, &["bets"])?.query(query);
        self.send(req).await
    }

    // ── Trading ────────────────────────────────────────────────────

    /// Place a market bet, or a limit order when `limit_prob` is set. `POST /bet`
    pub async fn place_bet(&self, bet: &PlaceBetRequest) -> Result<Value> {
        bet.validate()?;
        let req = self.request(Method::POST, &["bet"])?.json(bet);
        self.send(req).await
    }

    /// `POST /bet/cancel/{id}`
    pub async fn cancel_limit_order(&self, bet_id: &str) -> Result<Value> {
        require("bet id", bet_id)?;
        let req = self.request(Method::POST, &["bet", "cancel", bet_id])?;
        self.send(req).await
    }

    /// Sell shares in a market; the full position when `shares` is unset.
    /// `POST /market/{id}/sell`
    pub async fn sell(&self, market_id: &str, sale: &SellRequest) -> Result<Value> {
        require("market id", market_id)?;
        sale.validate()?;
        let req = self
            .request(Method::POST, &["market", market_id, "sell"])?
            .json(sale);
        self.send(req).await
    }

    // ── Internals ──────────────────────────────────────────────────

    /// Append `segments` to the base URL, percent-encoding each one.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| Error::Config(format!("base URL {} has no path", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, segments: &[&str]) -> Result<RequestBuilder> {
        let url = self.endpoint(segments)?;
        debug!(%method, %url, "Sending request");
        Ok(self.http.request(method, url))
    }

    async fn send<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T> {
        let resp = req.send().await?;
        let status = resp.status();
        let body = resp.text().await?;

        if !status.is_success() {
            let err = Error::from_response(status, body);
            warn!(status = status.as_u16(), "{err}");
            return Err(err);
        }

        debug!(status = status.as_u16(), bytes = body.len(), "Received response");
        serde_json::from_str(&body).map_err(|e| Error::Decode(e.to_string()))
    }
}

/// Empty path parameters would silently address a different endpoint.
fn require(name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::InvalidArgument(format!("{name} must not be empty")));
    }
    Ok(())
}
