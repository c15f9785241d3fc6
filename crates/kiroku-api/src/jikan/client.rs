use std::time::Duration;

use reqwest::{Client, StatusCode};
use url::Url;

use kiroku_core::config::CatalogConfig;
use kiroku_core::models::Title;

use super::error::JikanError;
use super::types::{JikanAnime, JikanListResponse, JikanSingleResponse};
use crate::traits::CatalogService;

const BASE_URL: &str = "https://api.jikan.moe/v4";

/// Number of titles requested by `popular()` unless configured otherwise.
const DEFAULT_POPULAR_LIMIT: u32 = 18;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for the Jikan v4 REST API (an unofficial MyAnimeList mirror).
pub struct JikanClient {
    base_url: String,
    popular_limit: u32,
    http: Client,
}

impl JikanClient {
    pub fn new() -> Result<Self, JikanError> {
        Self::with_base_url(BASE_URL)
    }

    pub fn with_base_url(base_url: &str) -> Result<Self, JikanError> {
        let http = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .user_agent(concat!("kiroku/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Self::build(base_url, DEFAULT_POPULAR_LIMIT, http)
    }

    pub fn from_config(config: &CatalogConfig) -> Result<Self, JikanError> {
        let timeout = match config.timeout_secs {
            0 => {
                tracing::warn!("catalog timeout of 0s ignored; using the default");
                DEFAULT_TIMEOUT
            }
            secs => Duration::from_secs(secs),
        };
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(config.user_agent.as_str())
            .build()?;
        Self::build(&config.base_url, config.popular_limit, http)
    }

    fn build(base_url: &str, popular_limit: u32, http: Client) -> Result<Self, JikanError> {
        Url::parse(base_url)?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            popular_limit,
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Check the HTTP response for errors and return the body text on failure.
    async fn check_response(resp: reqwest::Response) -> Result<reqwest::Response, JikanError> {
        if resp.status().is_success() {
            Ok(resp)
        } else {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            tracing::warn!(status, "Jikan API error");
            Err(JikanError::Api {
                status,
                message: body,
            })
        }
    }

    /// Decode a list envelope, normalizing each record on its own.
    async fn read_titles(resp: reqwest::Response) -> Result<Vec<Title>, JikanError> {
        let resp = Self::check_response(resp).await?;
        let page: JikanListResponse = resp
            .json()
            .await
            .map_err(|e| JikanError::Parse(e.to_string()))?;
        Ok(normalize_all(page.data))
    }

    pub async fn try_search(&self, query: &str) -> Result<Vec<Title>, JikanError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        let resp = self
            .http
            .get(format!("{}/anime", self.base_url))
            .query(&[("q", query)])
            .send()
            .await?;
        Self::read_titles(resp).await
    }

    pub async fn try_popular(&self) -> Result<Vec<Title>, JikanError> {
        let limit = self.popular_limit.to_string();
        let resp = self
            .http
            .get(format!("{}/top/anime", self.base_url))
            .query(&[
                ("limit", limit.as_str()),
                ("type", "tv"),
                ("filter", "bypopularity"),
            ])
            .send()
            .await?;
        Self::read_titles(resp).await
    }

    /// `Ok(None)` when the catalog has no such id.
    pub async fn try_get_by_id(&self, id: u64) -> Result<Option<Title>, JikanError> {
        let resp = self
            .http
            .get(format!("{}/anime/{id}", self.base_url))
            .send()
            .await?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let resp = Self::check_response(resp).await?;
        let single: JikanSingleResponse = resp
            .json()
            .await
            .map_err(|e| JikanError::Parse(e.to_string()))?;

        single
            .data
            .into_title()
            .map(Some)
            .map_err(|e| JikanError::Parse(e.to_string()))
    }
}

impl CatalogService for JikanClient {
    async fn search(&self, query: &str) -> Vec<Title> {
        self.try_search(query).await.unwrap_or_else(|e| {
            tracing::warn!(query, error = %e, "search failed");
            Vec::new()
        })
    }

    async fn popular(&self) -> Vec<Title> {
        self.try_popular().await.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "popular list failed");
            Vec::new()
        })
    }

    async fn get_by_id(&self, id: u64) -> Option<Title> {
        self.try_get_by_id(id).await.unwrap_or_else(|e| {
            tracing::warn!(id, error = %e, "lookup failed");
            None
        })
    }
}

/// Normalize each record, dropping (and logging) the ones that fail.
fn normalize_all(records: Vec<serde_json::Value>) -> Vec<Title> {
    let total = records.len();
    let titles: Vec<Title> = records
        .into_iter()
        .filter_map(|value| {
            let raw: JikanAnime = serde_json::from_value(value)
                .map_err(|e| tracing::debug!(error = %e, "undecodable record dropped"))
                .ok()?;
            raw.into_title()
                .map_err(|e| tracing::debug!(error = %e, "record dropped"))
                .ok()
        })
        .collect();
    if titles.len() < total {
        tracing::debug!(dropped = total - titles.len(), total, "normalization dropped records");
    }
    titles
}
