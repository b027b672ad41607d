pub mod booking;
pub mod movies;
pub mod payment;

use axum::Router;
use std::sync::Arc;

pub fn routes() -> Router<Arc<crate::AppState>> {
    Router::new()
        .merge(movies::routes())
        .merge(booking::routes())
        .merge(payment::routes())
}
