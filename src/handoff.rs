//! Передача сводки брони со страницы бронирования на страницу оплаты.
//!
//! Два способа, как в браузере: строка запроса (`?movie=..&time=..&seats=..`) и
//! "local storage" - хранилище строк по ключу. Данные читаются обратно как есть,
//! без версионирования схемы и без шифрования.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use crate::error::PaymentError;
use crate::models::booking::{join_seats, BookingSummary};
use crate::models::seat::SeatId;

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct HandoffQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<Uuid>,
    pub movie: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poster: Option<String>,
    pub time: Option<String>,
    pub seats: Option<String>,
    pub quantity: Option<String>,
}

/// `session=..&movie=..&time=..&seats=A1%2C+A2&quantity=2`
pub fn encode_query(summary: &BookingSummary) -> String {
    let query = HandoffQuery {
        session: Some(summary.session_id),
        movie: Some(summary.movie_title.clone()),
        poster: summary.poster_path.clone(),
        time: Some(summary.showtime.clone()),
        seats: Some(join_seats(&summary.seats)),
        quantity: Some(summary.quantity.to_string()),
    };
    serde_urlencoded::to_string(&query).unwrap_or_default()
}

/// Разбирает строку запроса страницы оплаты.
///
/// Без `movie` данных брони нет. Места делятся по `", "`, пустые отбрасываются.
/// Количество: из запроса, иначе число мест, иначе 1.
pub fn decode_query(raw: &str, unit_price: i64) -> Result<BookingSummary, PaymentError> {
    let raw = raw.trim_start_matches('?');
    let query: HandoffQuery =
        serde_urlencoded::from_str(raw).map_err(|_| PaymentError::MissingBookingData)?;

    let movie_title = query
        .movie
        .filter(|m| !m.trim().is_empty())
        .ok_or(PaymentError::MissingBookingData)?;

    let mut seats: Vec<SeatId> = query
        .seats
        .as_deref()
        .unwrap_or_default()
        .split(", ")
        .filter(|s| !s.trim().is_empty())
        .filter_map(|s| match s.parse() {
            Ok(seat) => Some(seat),
            Err(_) => {
                warn!("Dropping malformed seat '{}' from handoff", s);
                None
            }
        })
        .collect();
    seats.sort();
    seats.dedup();

    let quantity = query
        .quantity
        .and_then(|q| q.trim().parse::<u8>().ok())
        .filter(|q| *q > 0)
        .or_else(|| u8::try_from(seats.len()).ok().filter(|n| *n > 0))
        .unwrap_or(1);

    Ok(BookingSummary {
        session_id: query.session.unwrap_or_else(Uuid::nil),
        movie_title,
        poster_path: query.poster,
        showtime: query.time.unwrap_or_else(|| "Not selected".to_string()),
        seats,
        quantity,
        unit_price,
        subtotal: quantity as i64 * unit_price,
    })
}

/// Аналог local storage: JSON-строка сводки по id сессии, общий для всех обработчиков.
#[derive(Clone, Default)]
pub struct HandoffStore {
    entries: Arc<DashMap<Uuid, String>>,
}

impl HandoffStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn save(&self, summary: &BookingSummary) -> Result<(), serde_json::Error> {
        let json = serde_json::to_string(summary)?;
        self.entries.insert(summary.session_id, json);
        Ok(())
    }

    /// Читает сводку. Повреждённая запись считается отсутствующей.
    pub fn load(&self, session_id: Uuid) -> Option<BookingSummary> {
        let raw = self.entries.get(&session_id)?;
        match serde_json::from_str(raw.value()) {
            Ok(summary) => Some(summary),
            Err(e) => {
                warn!("Corrupted handoff for session {}: {}", session_id, e);
                None
            }
        }
    }

    pub fn remove(&self, session_id: Uuid) {
        self.entries.remove(&session_id);
    }

    pub fn contains(&self, session_id: Uuid) -> bool {
        self.entries.contains_key(&session_id)
    }

    /// Оставляет только записи, для которых `keep` вернул true. Возвращает число удалённых.
    pub fn retain(&self, keep: impl Fn(Uuid) -> bool) -> usize {
        let mut removed = 0;
        self.entries.retain(|id, _| {
            let kept = keep(*id);
            if !kept {
                removed += 1;
            }
            kept
        });
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary() -> BookingSummary {
        BookingSummary {
            session_id: Uuid::new_v4(),
            movie_title: "Coolie: The Powerhouse".to_string(),
            poster_path: Some("/coolie.jpg".to_string()),
            showtime: "6:30 PM".to_string(),
            seats: vec![SeatId::new('B', 2), SeatId::new('B', 10)],
            quantity: 2,
            unit_price: 150,
            subtotal: 300,
        }
    }

    #[test]
    fn query_handoff_reads_back_the_same_booking() {
        let original = summary();
        let query = encode_query(&original);
        assert!(query.contains("seats=B2%2C+B10"));

        let decoded = decode_query(&format!("?{}", query), 150).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn missing_movie_means_no_booking_data() {
        assert_eq!(
            decode_query("time=6%3A30+PM&seats=A1", 150),
            Err(PaymentError::MissingBookingData)
        );
        assert_eq!(decode_query("", 150), Err(PaymentError::MissingBookingData));
    }

    #[test]
    fn quantity_falls_back_to_seat_count_then_one() {
        let from_seats = decode_query("movie=War+2&seats=A1%2C+A2%2C+A3", 150).unwrap();
        assert_eq!(from_seats.quantity, 3);
        assert_eq!(from_seats.subtotal, 450);

        let bare = decode_query("movie=War+2&quantity=zero", 150).unwrap();
        assert_eq!(bare.quantity, 1);
        assert!(bare.seats.is_empty());
        assert_eq!(bare.showtime, "Not selected");
    }

    #[test]
    fn store_round_trip_and_removal() {
        let store = HandoffStore::new();
        let summary = summary();
        store.save(&summary).unwrap();
        assert_eq!(store.load(summary.session_id), Some(summary.clone()));

        store.remove(summary.session_id);
        assert!(!store.contains(summary.session_id));
        assert_eq!(store.load(summary.session_id), None);
    }

    #[test]
    fn retain_drops_orphaned_entries() {
        let store = HandoffStore::new();
        let kept = summary();
        let orphan = summary();
        store.save(&kept).unwrap();
        store.save(&orphan).unwrap();

        assert_eq!(store.retain(|id| id == kept.session_id), 1);
        assert_eq!(store.len(), 1);
        assert!(store.contains(kept.session_id));
    }

    #[test]
    fn retain_during_concurrent_saves_counts_only_its_own_removals() {
        let store = HandoffStore::new();
        let removed = std::thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| {
                    for _ in 0..2_000 {
                        store.save(&summary()).unwrap();
                    }
                });
            }
            (0..500).map(|_| store.retain(|_| false)).sum::<usize>()
        });

        // Всё, что не удалил retain, осталось в хранилище
        assert_eq!(removed + store.len(), 8_000);
    }
}
