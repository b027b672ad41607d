use axum::{
    extract::{Path, RawQuery, State},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use dashmap::mapref::one::RefMut;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{ApiResult, PaymentError};
use crate::handoff;
use crate::middleware::CorrelationId;
use crate::models::payment::{format_card_number, format_cvv, format_expiry, CardBrand};
use crate::models::PaymentMethod;
use crate::services::checkout::Checkout;
use crate::services::payment::{CancelToken, PaymentOutcome, PaymentRequest};
use crate::services::pricing::format_amount;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/payment/preview", get(preview_payment))
        .route("/payment/card/format", post(format_card))
        .route("/payment/{id}", get(get_checkout))
        .route("/payment/{id}/promo", post(apply_promo))
        .route("/payment/{id}/pay", post(pay).delete(cancel_payment))
}

/// Открывает страницу оплаты: уже открытую или из переданной сводки брони.
fn open_checkout(state: &AppState, id: Uuid) -> Result<RefMut<'_, Uuid, Checkout>, PaymentError> {
    if let Some(checkout) = state.checkouts.get_mut(&id) {
        return Ok(checkout);
    }

    let checkout = Checkout::from_handoff(state.handoffs.load(id), &state.pricing)?;
    info!(
        "Checkout opened for session {}: total {}",
        id,
        format_amount(checkout.total())
    );
    Ok(state.checkouts.entry(id).or_insert(checkout))
}

// GET /api/payment/{id}
async fn get_checkout(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let view = open_checkout(&state, id)?.view();
    Ok(Json(json!({ "success": true, "checkout": view })))
}

// GET /api/payment/preview?movie=..&time=..&seats=..&quantity=..
async fn preview_payment(
    State(state): State<Arc<AppState>>,
    RawQuery(query): RawQuery,
) -> ApiResult<impl IntoResponse> {
    let raw = query.as_deref().unwrap_or_default();
    let summary = handoff::decode_query(raw, state.pricing.unit_price())?;
    let checkout = Checkout::new(summary, &state.pricing);
    Ok(Json(json!({ "success": true, "checkout": checkout.view() })))
}

// POST /api/payment/{id}/promo
#[derive(Debug, Deserialize)]
pub struct PromoRequest {
    pub code: String,
}

async fn apply_promo(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<PromoRequest>,
) -> ApiResult<impl IntoResponse> {
    let mut checkout = open_checkout(&state, id)?;
    let discount = checkout
        .apply_promo(&req.code, &state.promos, &state.pricing)?
        .discount;

    Ok(Json(json!({
        "success": true,
        "message": format!("Promo code applied! You saved {}", format_amount(discount)),
        "checkout": checkout.view()
    })))
}

// POST /api/payment/{id}/pay
async fn pay(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    correlation_id: CorrelationId,
    Json(method): Json<PaymentMethod>,
) -> ApiResult<impl IntoResponse> {
    // Блокировку записи отпускаем до ожидания шлюза
    let (amount, summary) = {
        let mut checkout = open_checkout(&state, id)?;
        let amount = checkout.begin_payment()?;
        (amount, checkout.summary().clone())
    };

    info!(
        correlation_id = %correlation_id,
        "Payment started for session {}: {} via {}",
        id,
        format_amount(amount),
        method.kind()
    );

    // Держим до конца обработчика: сработает и при обрыве запроса
    let pending = PendingPayment::register(state.clone(), id);
    let card_brand = method.card_brand();
    let request = PaymentRequest {
        amount,
        summary,
        method,
    };
    let result = state.gateway.process(request, pending.token()).await;

    match result {
        Ok(PaymentOutcome::Approved(receipt)) => {
            // Бронь завершена: мастер, страница оплаты и передача больше не нужны
            state.sessions.remove(&id);
            state.checkouts.remove(&id);
            state.handoffs.remove(id);

            let confirmation_query = receipt.confirmation_query();
            Ok(Json(json!({
                "success": true,
                "message": format!("Payment successful! Booking ID: {}", receipt.booking_id),
                "receipt": receipt,
                "card_brand": card_brand,
                "confirmation_query": confirmation_query
            })))
        }
        Ok(PaymentOutcome::Declined) => Err(PaymentError::Declined.into()),
        Err(e) => Err(e.into()),
    }
}

/// Идущий платёж сессии. При сбросе убирает токен отмены и снимает флаг
/// обработки, так что после отказа, отмены или оборванного запроса страница
/// оплаты остаётся для повторной попытки.
struct PendingPayment {
    state: Arc<AppState>,
    id: Uuid,
    token: CancelToken,
}

impl PendingPayment {
    fn register(state: Arc<AppState>, id: Uuid) -> Self {
        let token = CancelToken::new();
        state.pending_payments.insert(id, token.clone());
        Self { state, id, token }
    }

    fn token(&self) -> CancelToken {
        self.token.clone()
    }
}

impl Drop for PendingPayment {
    fn drop(&mut self) {
        self.state.pending_payments.remove(&self.id);
        // После успешной оплаты страницы уже нет
        if let Some(mut checkout) = self.state.checkouts.get_mut(&self.id) {
            if checkout.is_processing() {
                warn!("Payment for session {} ended without approval", self.id);
                checkout.finish_payment();
            }
        }
    }
}

// DELETE /api/payment/{id}/pay
async fn cancel_payment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let cancelled = match state.pending_payments.get(&id) {
        Some(token) => {
            token.cancel();
            true
        }
        None => {
            warn!("No payment in progress for session {}", id);
            false
        }
    };

    Ok(Json(json!({ "success": true, "cancelled": cancelled })))
}

// POST /api/payment/card/format
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CardInput {
    pub number: String,
    pub expiry: String,
    pub cvv: String,
}

async fn format_card(Json(input): Json<CardInput>) -> impl IntoResponse {
    let number = format_card_number(&input.number);
    Json(json!({
        "success": true,
        "brand": CardBrand::detect(&number),
        "number": number,
        "expiry": format_expiry(&input.expiry),
        "cvv": format_cvv(&input.cvv)
    }))
}
