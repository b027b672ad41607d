//! error.rs
//!
//! Ошибки приложения. Каждая область (бронирование, оплата, каталог, конфигурация)
//! имеет своё перечисление; `ApiError` превращает их в JSON-ответ для клиента.
//! Тексты ошибок бронирования и оплаты показываются пользователю как уведомления.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::services::booking::BookingStep;

/// Предупреждения мастера бронирования. Ни одно из них не меняет состояние сессии.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BookingError {
    #[error("You can only select {limit} seats.")]
    CapacityExceeded { limit: u8 },
    #[error("Showtime '{0}' is not available")]
    UnknownShowtime(String),
    #[error("Seat '{0}' does not exist in this hall")]
    UnknownSeat(String),
    #[error("Cannot {action} while {step}")]
    InvalidStep { action: &'static str, step: BookingStep },
    #[error("Please select exactly {requested} seats ({chosen} selected)")]
    IncompleteSelection { requested: u8, chosen: usize },
    #[error("Please enter a promo code")]
    EmptyPromoCode,
    #[error("Invalid promo code")]
    InvalidPromoCode(String),
}

/// Ошибки шага оплаты.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaymentError {
    #[error("{0}")]
    Validation(String),
    #[error("Payment failed. Please try again.")]
    Declined,
    #[error("Payment was cancelled")]
    Cancelled,
    #[error("Payment is already being processed")]
    AlreadyProcessing,
    #[error("No booking data found. Please book tickets first.")]
    MissingBookingData,
}

/// Ошибки клиента каталога фильмов.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Circuit breaker is open - movie catalog temporarily unavailable")]
    CircuitOpen,
    #[error("Movie catalog request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Movie catalog returned status {0}")]
    Status(u16),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("environment variable {key} has invalid value '{value}'")]
    Invalid { key: &'static str, value: String },
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// Ошибка HTTP-слоя.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Booking(#[from] BookingError),
    #[error(transparent)]
    Payment(#[from] PaymentError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error("Booking session {0} not found")]
    SessionNotFound(uuid::Uuid),
    #[error("{0}")]
    BadRequest(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Booking(BookingError::InvalidStep { .. })
            | ApiError::Booking(BookingError::IncompleteSelection { .. }) => StatusCode::CONFLICT,
            ApiError::Booking(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Payment(PaymentError::Validation(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Payment(PaymentError::Declined) => StatusCode::PAYMENT_REQUIRED,
            ApiError::Payment(PaymentError::Cancelled)
            | ApiError::Payment(PaymentError::AlreadyProcessing) => StatusCode::CONFLICT,
            ApiError::Payment(PaymentError::MissingBookingData) => StatusCode::NOT_FOUND,
            ApiError::Catalog(CatalogError::CircuitOpen) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Catalog(_) => StatusCode::BAD_GATEWAY,
            ApiError::SessionNotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() || status == StatusCode::BAD_GATEWAY {
            tracing::error!("API error: {}", self);
        } else {
            tracing::warn!("Rejected request: {}", self);
        }

        let body = match &self {
            // Клиент должен вернуть пользователя к началу бронирования
            ApiError::Payment(PaymentError::MissingBookingData) => json!({
                "success": false,
                "error": self.to_string(),
                "redirect": "/"
            }),
            _ => json!({
                "success": false,
                "error": self.to_string()
            }),
        };

        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
