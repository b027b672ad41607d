use dashmap::DashMap;
use std::sync::Arc;
use tokio::time::{Duration, Instant};
use tracing::{debug, info};

use crate::catalog_client::{CatalogClient, Listing};
use crate::models::Movie;

#[derive(Debug, Clone)]
struct CachedListing {
    movies: Vec<Movie>,
    expires_at: Instant,
}

/// Кеш ответов каталога в памяти процесса с TTL.
#[derive(Clone)]
pub struct CatalogCache {
    entries: Arc<DashMap<String, CachedListing>>,
    ttl: Duration,
}

impl CatalogCache {
    pub fn new(ttl_seconds: u64) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            ttl: Duration::from_secs(ttl_seconds),
        }
    }

    pub fn listing_key(listing: Listing, page: u32) -> String {
        format!("movies:{}:p={}", listing.cache_name(), page)
    }

    pub fn search_key(query: &str, page: u32) -> String {
        format!("movies:search:q={}&p={}", query.to_lowercase(), page)
    }

    /// Получает список из кеша, если запись ещё не истекла.
    pub fn get(&self, key: &str) -> Option<Vec<Movie>> {
        let now = Instant::now();
        if let Some(entry) = self.entries.get(key) {
            if entry.expires_at > now {
                return Some(entry.movies.clone());
            }
        }
        // Удаляем только истёкшую запись: свежий put между чтением и удалением остаётся
        self.entries.remove_if(key, |_, entry| entry.expires_at <= now);
        None
    }

    pub fn put(&self, key: String, movies: Vec<Movie>) {
        let expires_at = Instant::now() + self.ttl;
        self.entries.insert(key, CachedListing { movies, expires_at });
    }

    /// Удаляет истёкшие записи, возвращает их количество.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut removed = 0;
        self.entries.retain(|_, entry| {
            let keep = entry.expires_at > now;
            if !keep {
                removed += 1;
            }
            keep
        });
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    // Прогрев кеша при старте
    pub async fn warmup(&self, client: &CatalogClient) {
        info!("Starting catalog cache warmup...");

        for listing in [Listing::NowPlaying, Listing::Upcoming] {
            match client.listing(listing, 1).await {
                Ok(movies) => {
                    info!("Loaded {} {} movies", movies.len(), listing.cache_name());
                    self.put(Self::listing_key(listing, 1), movies);
                }
                Err(e) => debug!("Warmup of {} skipped: {}", listing.cache_name(), e),
            }
        }

        info!("Catalog cache warmup done");
    }
}
