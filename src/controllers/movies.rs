use axum::{
    extract::{Query, State},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::future::Future;
use std::sync::Arc;

use crate::cache::CatalogCache;
use crate::catalog_client::{CatalogClient, Listing};
use crate::error::{ApiResult, CatalogError};
use crate::models::Movie;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/movies/now-playing", get(now_playing))
        .route("/movies/upcoming", get(upcoming))
        .route("/movies/search", get(search_movies))
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub query: Option<String>,
    pub page: Option<u32>,
}

/// Фильм для карточки: данные каталога + готовые ссылка на постер и рейтинг.
#[derive(Debug, Serialize)]
pub struct MovieCard {
    pub id: i64,
    pub title: String,
    pub overview: String,
    pub poster_path: Option<String>,
    pub poster_url: Option<String>,
    pub rating: String,
    pub release_date: Option<String>,
}

impl MovieCard {
    fn from_movie(movie: Movie, image_base_url: &str) -> Self {
        Self {
            poster_url: movie.poster_url(image_base_url),
            rating: movie.rating_label(),
            id: movie.id,
            title: movie.title,
            overview: movie.overview,
            poster_path: movie.poster_path,
            release_date: movie.release_date,
        }
    }
}

pub async fn now_playing(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PageQuery>,
) -> ApiResult<Response> {
    listing(state, Listing::NowPlaying, params.page.unwrap_or(1)).await
}

pub async fn upcoming(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PageQuery>,
) -> ApiResult<Response> {
    listing(state, Listing::Upcoming, params.page.unwrap_or(1)).await
}

async fn listing(state: Arc<AppState>, listing: Listing, page: u32) -> ApiResult<Response> {
    let page = page.max(1);
    let key = CatalogCache::listing_key(listing, page);
    cached(&state, key, page, state.catalog.listing(listing, page)).await
}

pub async fn search_movies(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchQuery>,
) -> ApiResult<Response> {
    let page = params.page.unwrap_or(1).max(1);
    let query = CatalogClient::prepare_search_query(params.query.as_deref().unwrap_or_default());

    // Пустой запрос: пустой результат, в каталог и кеш не ходим
    if query.is_empty() {
        return Ok(Json(json!({
            "success": true,
            "movies": [],
            "page": page,
            "count": 0
        }))
        .into_response());
    }

    let key = CatalogCache::search_key(&query, page);
    cached(&state, key, page, state.catalog.search(&query, page)).await
}

/// Отдаёт список из кеша (`X-Cache: HIT`) или загружает его и кладёт в кеш (`MISS`).
async fn cached<F>(state: &AppState, key: String, page: u32, fetch: F) -> ApiResult<Response>
where
    F: Future<Output = Result<Vec<Movie>, CatalogError>>,
{
    // 1. Пытаемся получить результат из кеша
    if let Some(movies) = state.cache.get(&key) {
        return Ok(render(state, movies, page, "HIT"));
    }

    // 2. Cache Miss: идём в каталог
    let movies = fetch.await.map_err(|e| {
        tracing::error!("Failed to load movies for {}: {}", key, e);
        e
    })?;

    state.cache.put(key, movies.clone());
    Ok(render(state, movies, page, "MISS"))
}

fn render(state: &AppState, movies: Vec<Movie>, page: u32, cache_status: &'static str) -> Response {
    let image_base_url = state.catalog.image_base_url();
    let cards: Vec<MovieCard> = movies
        .into_iter()
        .map(|movie| MovieCard::from_movie(movie, image_base_url))
        .collect();

    (
        [("X-Cache", cache_status)],
        Json(json!({
            "success": true,
            "count": cards.len(),
            "page": page,
            "movies": cards
        })),
    )
        .into_response()
}
