pub mod cache;
pub mod catalog_client;
pub mod config;
pub mod controllers;
pub mod error;
pub mod handoff;
pub mod middleware;
pub mod models;
pub mod services;

use axum::{middleware::from_fn, routing::get, Router};
use dashmap::DashMap;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use uuid::Uuid;

use crate::cache::CatalogCache;
use crate::catalog_client::CatalogClient;
use crate::config::Config;
use crate::error::ConfigError;
use crate::handoff::HandoffStore;
use crate::models::{PromoCatalog, SeatLayout};
use crate::services::booking::BookingSession;
use crate::services::checkout::Checkout;
use crate::services::payment::{CancelToken, MockPaymentGateway};
use crate::services::pricing::PricingCalculator;

// Shared state для всего приложения
pub struct AppState {
    pub config: Config,
    pub catalog: CatalogClient,
    pub cache: CatalogCache,
    /// Мастера бронирования по id сессии
    pub sessions: DashMap<Uuid, BookingSession>,
    pub handoffs: HandoffStore,
    /// Открытые страницы оплаты
    pub checkouts: DashMap<Uuid, Checkout>,
    /// Токены отмены платежей, которые сейчас в обработке
    pub pending_payments: DashMap<Uuid, CancelToken>,
    pub gateway: MockPaymentGateway,
    pub promos: PromoCatalog,
    pub pricing: PricingCalculator,
    pub layout: SeatLayout,
}

impl AppState {
    pub fn new(config: Config) -> Result<Arc<Self>, ConfigError> {
        let catalog = CatalogClient::new(&config.catalog, &config.circuit_breaker)?;
        let cache = CatalogCache::new(config.catalog.cache_ttl_seconds);
        let gateway = MockPaymentGateway::from_config(&config.payment);
        let pricing = PricingCalculator::from_config(&config.pricing);
        let layout = SeatLayout::for_variant(config.booking.seat_layout);

        Ok(Arc::new(Self {
            catalog,
            cache,
            sessions: DashMap::new(),
            handoffs: HandoffStore::new(),
            checkouts: DashMap::new(),
            pending_payments: DashMap::new(),
            gateway,
            promos: PromoCatalog::default(),
            pricing,
            layout,
            config,
        }))
    }

    /// Новый мастер бронирования с настройками приложения. В `sessions` не кладётся.
    pub fn new_session(&self, movie_title: &str, poster_path: Option<String>) -> BookingSession {
        BookingSession::new(
            movie_title,
            poster_path,
            self.config.booking.showtimes.clone(),
            self.layout.clone(),
            self.pricing.unit_price(),
        )
        .with_max_tickets(self.config.booking.max_tickets)
    }
}

/// Полный роутер приложения со всеми слоями.
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(|| async { "MovieWave API v1.0" }))
        .route("/health", get(|| async { "OK" }))
        .nest("/api", controllers::routes())
        .with_state(state)
        .layer(from_fn(middleware::correlation_id))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
