use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult, BookingError};
use crate::handoff;
use crate::models::SeatId;
use crate::services::booking::{BookingSession, SeatToggle, SessionView};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/bookings", post(create_session))
        .route("/bookings/{id}", get(get_session).delete(reset_session))
        .route("/bookings/{id}/showtime", patch(select_showtime))
        .route("/bookings/{id}/quantity", patch(update_quantity))
        .route("/bookings/{id}/quantity/confirm", post(confirm_quantity))
        .route("/bookings/{id}/seats/toggle", patch(toggle_seat))
        .route("/bookings/{id}/confirm", post(confirm_booking))
}

/* ---------- helpers ---------- */

/// Выполняет действие над сессией. Ошибка мастера не меняет её состояние.
fn with_session<T>(
    state: &AppState,
    id: Uuid,
    action: impl FnOnce(&mut BookingSession) -> Result<T, BookingError>,
) -> ApiResult<T> {
    let mut session = state.sessions.get_mut(&id).ok_or(ApiError::SessionNotFound(id))?;
    Ok(action(session.value_mut())?)
}

fn session_view(state: &AppState, id: Uuid) -> ApiResult<SessionView> {
    state
        .sessions
        .get(&id)
        .map(|session| session.summary_view())
        .ok_or(ApiError::SessionNotFound(id))
}

/* ---------- SESSIONS ---------- */

// POST /api/bookings
#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    pub movie_title: String,
    pub poster_path: Option<String>,
}

async fn create_session(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateSessionRequest>,
) -> ApiResult<impl IntoResponse> {
    let title = req.movie_title.trim();
    if title.is_empty() {
        return Err(ApiError::BadRequest("movie_title is required".to_string()));
    }

    let session = state.new_session(title, req.poster_path);
    let view = session.summary_view();
    state.sessions.insert(session.id(), session);
    info!("Booking session {} opened for '{}'", view.id, view.movie_title);

    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "session": view })),
    ))
}

// GET /api/bookings/{id}
async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let (view, seat_map) = state
        .sessions
        .get(&id)
        .map(|session| (session.summary_view(), session.seat_map()))
        .ok_or(ApiError::SessionNotFound(id))?;

    Ok(Json(json!({ "success": true, "session": view, "seat_map": seat_map })))
}

// DELETE /api/bookings/{id} - повторный вход в мастер
async fn reset_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    with_session(&state, id, |session| {
        session.reset();
        Ok(())
    })?;
    // Незавершённая оплата по этой сессии больше не актуальна
    if !state.pending_payments.contains_key(&id) {
        state.checkouts.remove(&id);
        state.handoffs.remove(id);
    }

    Ok(Json(json!({ "success": true, "session": session_view(&state, id)? })))
}

/* ---------- WIZARD STEPS ---------- */

// PATCH /api/bookings/{id}/showtime
#[derive(Debug, Deserialize)]
pub struct ShowtimeRequest {
    pub time: String,
}

async fn select_showtime(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<ShowtimeRequest>,
) -> ApiResult<impl IntoResponse> {
    with_session(&state, id, |session| session.select_time(&req.time))?;
    Ok(Json(json!({ "success": true, "session": session_view(&state, id)? })))
}

// PATCH /api/bookings/{id}/quantity
#[derive(Debug, Deserialize)]
pub struct QuantityRequest {
    pub quantity: Option<i64>,
    pub delta: Option<i64>,
}

async fn update_quantity(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<QuantityRequest>,
) -> ApiResult<impl IntoResponse> {
    let quantity = match (req.quantity, req.delta) {
        (Some(quantity), _) => with_session(&state, id, |s| s.set_quantity(quantity))?,
        (None, Some(delta)) => with_session(&state, id, |s| s.adjust_quantity(delta))?,
        (None, None) => {
            return Err(ApiError::BadRequest(
                "Either quantity or delta is required".to_string(),
            ))
        }
    };

    Ok(Json(json!({ "success": true, "quantity": quantity })))
}

// POST /api/bookings/{id}/quantity/confirm
async fn confirm_quantity(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let seat_map = with_session(&state, id, |session| session.confirm_quantity())?;
    Ok(Json(json!({
        "success": true,
        "session": session_view(&state, id)?,
        "seat_map": seat_map
    })))
}

// PATCH /api/bookings/{id}/seats/toggle
#[derive(Debug, Deserialize)]
pub struct ToggleSeatRequest {
    pub seat: String,
}

#[derive(Debug, Serialize)]
struct ToggleSeatResponse {
    success: bool,
    seat: SeatId,
    result: SeatToggle,
    session: SessionView,
}

async fn toggle_seat(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<ToggleSeatRequest>,
) -> ApiResult<impl IntoResponse> {
    let seat: SeatId = req.seat.parse()?;
    let result = with_session(&state, id, |session| session.toggle_seat(seat))?;

    Ok(Json(ToggleSeatResponse {
        success: true,
        seat,
        result,
        session: session_view(&state, id)?,
    }))
}

// POST /api/bookings/{id}/confirm
async fn confirm_booking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let summary = with_session(&state, id, |session| session.confirm())?;

    // Сводка уходит на страницу оплаты двумя путями: хранилище и строка запроса
    if let Err(e) = state.handoffs.save(&summary) {
        error!("Failed to store handoff for session {}: {}", id, e);
    }
    let payment_query = handoff::encode_query(&summary);

    Ok(Json(json!({
        "success": true,
        "summary": summary,
        "seats_label": summary.seats_label(),
        "payment_query": payment_query
    })))
}
