use serde::Serialize;
use std::sync::Arc;
use tokio::time::Duration;
use tracing::{info, warn};

use crate::config::{CatalogConfig, CircuitBreakerConfig};
use crate::error::CatalogError;
use crate::models::movie::{Movie, MoviePage};
use crate::services::circuit_breaker::{CircuitBreaker, CircuitState};

/// Какой список фильмов запрашивать.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Listing {
    NowPlaying,
    Upcoming,
}

impl Listing {
    fn endpoint(self) -> &'static str {
        match self {
            Listing::NowPlaying => "movie/now_playing",
            Listing::Upcoming => "movie/upcoming",
        }
    }

    pub fn cache_name(self) -> &'static str {
        match self {
            Listing::NowPlaying => "now_playing",
            Listing::Upcoming => "upcoming",
        }
    }
}

#[derive(Serialize)]
struct CatalogQuery<'a> {
    api_key: &'a str,
    language: &'a str,
    page: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    query: Option<&'a str>,
}

/// Клиент каталога фильмов (TMDB), только чтение.
#[derive(Clone)]
pub struct CatalogClient {
    http_client: reqwest::Client,
    base_url: String,
    api_key: String,
    language: String,
    image_base_url: String,
    circuit_breaker: Arc<CircuitBreaker>,
}

impl CatalogClient {
    pub fn new(
        config: &CatalogConfig,
        breaker: &CircuitBreakerConfig,
    ) -> Result<Self, reqwest::Error> {
        if config.api_key.is_empty() {
            warn!("TMDB_API_KEY is not set - catalog requests will be rejected upstream");
        }

        Ok(Self {
            http_client: reqwest::Client::builder()
                .timeout(Duration::from_secs(config.timeout_seconds))
                .build()?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            language: config.language.clone(),
            image_base_url: config.image_base_url.clone(),
            circuit_breaker: Arc::new(CircuitBreaker::new(
                breaker.failure_threshold,
                breaker.timeout_seconds,
            )),
        })
    }

    pub fn image_base_url(&self) -> &str {
        &self.image_base_url
    }

    pub async fn now_playing(&self, page: u32) -> Result<Vec<Movie>, CatalogError> {
        self.listing(Listing::NowPlaying, page).await
    }

    pub async fn upcoming(&self, page: u32) -> Result<Vec<Movie>, CatalogError> {
        self.listing(Listing::Upcoming, page).await
    }

    pub async fn listing(&self, listing: Listing, page: u32) -> Result<Vec<Movie>, CatalogError> {
        self.fetch(listing.endpoint(), page, None).await
    }

    /// Поиск по названию. Пустой после очистки запрос не уходит в сеть.
    pub async fn search(&self, query: &str, page: u32) -> Result<Vec<Movie>, CatalogError> {
        let query = Self::prepare_search_query(query);
        if query.is_empty() {
            return Ok(Vec::new());
        }
        self.fetch("search/movie", page, Some(&query)).await
    }

    /// Выполняет запрос, пропуская его через Circuit Breaker.
    async fn fetch(
        &self,
        endpoint: &str,
        page: u32,
        query: Option<&str>,
    ) -> Result<Vec<Movie>, CatalogError> {
        if !self.circuit_breaker.can_execute() {
            warn!("Circuit breaker is OPEN - blocking catalog request to {}", endpoint);
            return Err(CatalogError::CircuitOpen);
        }

        let params = CatalogQuery {
            api_key: &self.api_key,
            language: &self.language,
            page: page.max(1),
            query,
        };

        let result = async {
            let response = self
                .http_client
                .get(format!("{}/{}", self.base_url, endpoint))
                .query(&params)
                .send()
                .await?;
            if !response.status().is_success() {
                return Err(CatalogError::Status(response.status().as_u16()));
            }
            Ok(response.json::<MoviePage>().await?)
        }
        .await;

        match result {
            Ok(page) => {
                self.circuit_breaker.record_success();
                info!("Catalog {} returned {} movies", endpoint, page.results.len());
                Ok(page.results)
            }
            Err(e) => {
                self.circuit_breaker.record_failure();
                Err(e)
            }
        }
    }

    pub fn circuit_status(&self) -> (CircuitState, u32) {
        self.circuit_breaker.status()
    }

    pub fn prepare_search_query(query: &str) -> String {
        query
            .chars()
            .filter(|c| c.is_alphanumeric() || c.is_whitespace() || *c == '-')
            .collect::<String>()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }
}
