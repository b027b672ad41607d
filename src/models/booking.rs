use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::seat::SeatId;

/// Итог мастера бронирования. Создаётся один раз при подтверждении и дальше не меняется.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingSummary {
    pub session_id: Uuid,
    pub movie_title: String,
    pub poster_path: Option<String>,
    pub showtime: String,
    pub seats: Vec<SeatId>,
    pub quantity: u8,
    pub unit_price: i64,
    pub subtotal: i64,
}

impl BookingSummary {
    /// Места через запятую в порядке отображения: `A1, A2`.
    pub fn seats_label(&self) -> String {
        join_seats(&self.seats)
    }
}

pub fn join_seats(seats: &[SeatId]) -> String {
    seats
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Квитанция успешной оплаты.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentReceipt {
    pub booking_id: String,
    pub movie_title: String,
    pub poster_path: Option<String>,
    pub showtime: String,
    pub seats: String,
    pub quantity: u8,
    pub amount: i64,
    pub payment_method: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Serialize)]
struct ConfirmationQuery<'a> {
    payment: &'static str,
    booking: &'a str,
    movie: &'a str,
    seats: &'a str,
    amount: i64,
}

impl PaymentReceipt {
    /// Строка запроса для страницы подтверждения заказа.
    pub fn confirmation_query(&self) -> String {
        let query = ConfirmationQuery {
            payment: "success",
            booking: &self.booking_id,
            movie: &self.movie_title,
            seats: &self.seats,
            amount: self.amount,
        };
        serde_urlencoded::to_string(&query).unwrap_or_default()
    }
}

const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

fn to_base36(mut value: u64) -> String {
    if value == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while value > 0 {
        digits.push(BASE36[(value % 36) as usize]);
        value /= 36;
    }
    digits.reverse();
    String::from_utf8(digits).unwrap_or_default()
}

/// Номер брони: `BK` + время в base36 + 5 случайных символов, в верхнем регистре.
pub fn generate_booking_id<R: Rng + ?Sized>(now: DateTime<Utc>, rng: &mut R) -> String {
    let timestamp = to_base36(now.timestamp_millis().max(0) as u64);
    let random: String = (0..5)
        .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
        .collect();
    format!("BK{}{}", timestamp, random).to_uppercase()
}
