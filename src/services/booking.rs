//! booking.rs
//!
//! Сессия бронирования - пошаговый мастер:
//! выбор сеанса -> количество билетов -> выбор мест -> подтверждение.
//!
//! Переходы только вперёд. Повторный вход в мастер (`reset`) возвращает к выбору сеанса.
//! Инвариант: выбранных мест не больше, чем запрошенных билетов. Подтверждение возможно
//! только когда их ровно столько, сколько запрошено.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::BookingError;
use crate::models::booking::{join_seats, BookingSummary};
use crate::models::seat::{SeatId, SeatLayout, SeatRow};

pub const DEFAULT_MAX_TICKETS: u8 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStep {
    SelectingTime,
    SelectingQuantity,
    SelectingSeats,
    Confirmed,
}

impl fmt::Display for BookingStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            BookingStep::SelectingTime => "selecting a showtime",
            BookingStep::SelectingQuantity => "selecting the number of tickets",
            BookingStep::SelectingSeats => "selecting seats",
            BookingStep::Confirmed => "the booking is confirmed",
        };
        f.write_str(label)
    }
}

/// Результат клика по месту.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SeatToggle {
    Selected,
    Released,
    /// Место уже занято - клик игнорируется
    Ignored,
}

#[derive(Debug, Clone)]
pub struct BookingSession {
    id: Uuid,
    movie_title: String,
    poster_path: Option<String>,
    showtimes: Vec<String>,
    showtime: Option<String>,
    requested: u8,
    max_tickets: u8,
    chosen: BTreeSet<SeatId>,
    layout: SeatLayout,
    unit_price: i64,
    step: BookingStep,
    last_activity: DateTime<Utc>,
}

/// Текущее состояние для отрисовки.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub id: Uuid,
    pub step: BookingStep,
    pub movie_title: String,
    pub poster_path: Option<String>,
    pub showtimes: Vec<String>,
    pub showtime: Option<String>,
    pub quantity: u8,
    pub max_tickets: u8,
    pub seats: Vec<SeatId>,
    pub seats_label: String,
    pub running_total: i64,
    pub can_confirm: bool,
}

impl BookingSession {
    pub fn new(
        movie_title: impl Into<String>,
        poster_path: Option<String>,
        showtimes: Vec<String>,
        layout: SeatLayout,
        unit_price: i64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            movie_title: movie_title.into(),
            poster_path,
            showtimes,
            showtime: None,
            requested: 1,
            max_tickets: DEFAULT_MAX_TICKETS,
            chosen: BTreeSet::new(),
            layout,
            unit_price,
            step: BookingStep::SelectingTime,
            last_activity: Utc::now(),
        }
    }

    pub fn with_max_tickets(mut self, max_tickets: u8) -> Self {
        self.max_tickets = max_tickets.max(1);
        self.requested = self.requested.min(self.max_tickets);
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn step(&self) -> BookingStep {
        self.step
    }

    pub fn movie_title(&self) -> &str {
        &self.movie_title
    }

    pub fn showtime(&self) -> Option<&str> {
        self.showtime.as_deref()
    }

    pub fn requested_seat_count(&self) -> u8 {
        self.requested
    }

    /// Выбранные места в порядке отображения.
    pub fn chosen_seats(&self) -> Vec<SeatId> {
        self.chosen.iter().copied().collect()
    }

    pub fn last_activity(&self) -> DateTime<Utc> {
        self.last_activity
    }

    fn touch(&mut self) {
        self.last_activity = Utc::now();
    }

    fn expect_step(&self, expected: BookingStep, action: &'static str) -> Result<(), BookingError> {
        if self.step == expected {
            Ok(())
        } else {
            Err(BookingError::InvalidStep {
                action,
                step: self.step,
            })
        }
    }

    /// Повторный вход в мастер: всё сбрасывается к выбору сеанса.
    pub fn reset(&mut self) {
        self.showtime = None;
        self.requested = 1;
        self.chosen.clear();
        self.step = BookingStep::SelectingTime;
        self.touch();
        debug!("Booking session {} reset", self.id);
    }

    pub fn select_time(&mut self, time: &str) -> Result<(), BookingError> {
        self.expect_step(BookingStep::SelectingTime, "select a showtime")?;
        let time = time.trim();
        if !self.showtimes.iter().any(|t| t == time) {
            return Err(BookingError::UnknownShowtime(time.to_string()));
        }

        self.showtime = Some(time.to_string());
        self.step = BookingStep::SelectingQuantity;
        self.touch();
        info!("Session {}: showtime {} selected", self.id, time);
        Ok(())
    }

    /// Сохраняет количество билетов, зажимая его в 1..=max. Шаг не меняется.
    pub fn set_quantity(&mut self, quantity: i64) -> Result<u8, BookingError> {
        self.expect_step(BookingStep::SelectingQuantity, "change the number of tickets")?;
        self.requested = quantity.clamp(1, self.max_tickets as i64) as u8;
        self.touch();
        Ok(self.requested)
    }

    /// Кнопки +/-.
    pub fn adjust_quantity(&mut self, delta: i64) -> Result<u8, BookingError> {
        let target = self.requested as i64 + delta;
        self.set_quantity(target)
    }

    pub fn confirm_quantity(&mut self) -> Result<Vec<SeatRow>, BookingError> {
        self.expect_step(BookingStep::SelectingQuantity, "confirm the number of tickets")?;
        self.chosen.clear();
        self.step = BookingStep::SelectingSeats;
        self.touch();
        info!("Session {}: {} tickets requested", self.id, self.requested);
        Ok(self.seat_map())
    }

    pub fn toggle_seat(&mut self, seat: SeatId) -> Result<SeatToggle, BookingError> {
        self.expect_step(BookingStep::SelectingSeats, "select seats")?;
        if !self.layout.contains(&seat) {
            return Err(BookingError::UnknownSeat(seat.to_string()));
        }
        if self.layout.is_booked(&seat) {
            return Ok(SeatToggle::Ignored);
        }

        self.touch();
        if self.chosen.remove(&seat) {
            debug!("Session {}: seat {} released", self.id, seat);
            return Ok(SeatToggle::Released);
        }
        if self.chosen.len() >= self.requested as usize {
            return Err(BookingError::CapacityExceeded {
                limit: self.requested,
            });
        }
        self.chosen.insert(seat);
        debug!("Session {}: seat {} selected", self.id, seat);
        Ok(SeatToggle::Selected)
    }

    pub fn can_confirm(&self) -> bool {
        self.step == BookingStep::SelectingSeats
            && self.requested > 0
            && self.chosen.len() == self.requested as usize
    }

    pub fn confirm(&mut self) -> Result<BookingSummary, BookingError> {
        self.expect_step(BookingStep::SelectingSeats, "confirm the booking")?;
        if !self.can_confirm() {
            return Err(BookingError::IncompleteSelection {
                requested: self.requested,
                chosen: self.chosen.len(),
            });
        }

        let seats = self.chosen_seats();
        let summary = BookingSummary {
            session_id: self.id,
            movie_title: self.movie_title.clone(),
            poster_path: self.poster_path.clone(),
            showtime: self.showtime.clone().unwrap_or_default(),
            quantity: self.requested,
            unit_price: self.unit_price,
            subtotal: seats.len() as i64 * self.unit_price,
            seats,
        };

        self.step = BookingStep::Confirmed;
        self.touch();
        info!(
            "Session {}: booking confirmed for '{}' at {} seats [{}]",
            self.id,
            summary.movie_title,
            summary.showtime,
            summary.seats_label()
        );
        Ok(summary)
    }

    pub fn seat_map(&self) -> Vec<SeatRow> {
        self.layout.grid(&self.chosen)
    }

    pub fn summary_view(&self) -> SessionView {
        let seats = self.chosen_seats();
        SessionView {
            id: self.id,
            step: self.step,
            movie_title: self.movie_title.clone(),
            poster_path: self.poster_path.clone(),
            showtimes: self.showtimes.clone(),
            showtime: self.showtime.clone(),
            quantity: self.requested,
            max_tickets: self.max_tickets,
            seats_label: join_seats(&seats),
            running_total: seats.len() as i64 * self.unit_price,
            seats,
            can_confirm: self.can_confirm(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seat(id: &str) -> SeatId {
        id.parse().unwrap()
    }

    fn session() -> BookingSession {
        BookingSession::new(
            "F1: The Movie",
            Some("/f1.jpg".to_string()),
            vec!["12:00 PM".to_string(), "6:30 PM".to_string()],
            SeatLayout::classic(),
            150,
        )
    }

    fn at_seats(quantity: i64) -> BookingSession {
        let mut s = session();
        s.select_time("6:30 PM").unwrap();
        s.set_quantity(quantity).unwrap();
        s.confirm_quantity().unwrap();
        s
    }

    #[test]
    fn walks_through_every_step() {
        let mut s = session();
        assert_eq!(s.step(), BookingStep::SelectingTime);

        s.select_time("6:30 PM").unwrap();
        assert_eq!(s.step(), BookingStep::SelectingQuantity);
        assert_eq!(s.showtime(), Some("6:30 PM"));

        assert_eq!(s.adjust_quantity(1).unwrap(), 2);
        let grid = s.confirm_quantity().unwrap();
        assert_eq!(grid.len(), 10);
        assert_eq!(s.step(), BookingStep::SelectingSeats);

        s.toggle_seat(seat("B2")).unwrap();
        assert!(!s.can_confirm());
        s.toggle_seat(seat("A10")).unwrap();
        assert!(s.can_confirm());

        let summary = s.confirm().unwrap();
        assert_eq!(s.step(), BookingStep::Confirmed);
        assert_eq!(summary.seats_label(), "A10, B2");
        assert_eq!(summary.quantity, 2);
        assert_eq!(summary.subtotal, 300);
    }

    #[test]
    fn quantity_is_clamped() {
        let mut s = session();
        s.select_time("12:00 PM").unwrap();
        assert_eq!(s.set_quantity(0).unwrap(), 1);
        assert_eq!(s.set_quantity(42).unwrap(), 10);
        assert_eq!(s.adjust_quantity(1).unwrap(), 10);
        assert_eq!(s.step(), BookingStep::SelectingQuantity);
    }

    #[test]
    fn unknown_showtime_is_rejected() {
        let mut s = session();
        assert_eq!(
            s.select_time("3:00 AM"),
            Err(BookingError::UnknownShowtime("3:00 AM".to_string()))
        );
        assert_eq!(s.step(), BookingStep::SelectingTime);
    }

    #[test]
    fn no_backward_transitions() {
        let mut s = at_seats(1);
        assert!(matches!(
            s.select_time("12:00 PM"),
            Err(BookingError::InvalidStep { .. })
        ));
        assert!(matches!(s.set_quantity(3), Err(BookingError::InvalidStep { .. })));
        assert_eq!(s.step(), BookingStep::SelectingSeats);
    }

    #[test]
    fn capacity_is_enforced() {
        let mut s = at_seats(1);
        assert_eq!(s.toggle_seat(seat("A1")).unwrap(), SeatToggle::Selected);
        assert_eq!(
            s.toggle_seat(seat("A2")),
            Err(BookingError::CapacityExceeded { limit: 1 })
        );
        assert_eq!(s.chosen_seats(), vec![seat("A1")]);
    }

    #[test]
    fn booked_seats_are_ignored() {
        let mut s = at_seats(2);
        s.toggle_seat(seat("A1")).unwrap();
        assert_eq!(s.toggle_seat(seat("A5")).unwrap(), SeatToggle::Ignored);
        assert_eq!(s.chosen_seats(), vec![seat("A1")]);
    }

    #[test]
    fn seats_outside_the_hall_are_rejected() {
        let mut s = at_seats(2);
        assert_eq!(
            s.toggle_seat(seat("Z1")),
            Err(BookingError::UnknownSeat("Z1".to_string()))
        );
    }

    #[test]
    fn confirm_requires_exact_selection() {
        let mut s = at_seats(3);
        s.toggle_seat(seat("C1")).unwrap();
        assert_eq!(
            s.confirm(),
            Err(BookingError::IncompleteSelection {
                requested: 3,
                chosen: 1
            })
        );
        assert_eq!(s.step(), BookingStep::SelectingSeats);
    }

    #[test]
    fn reset_returns_to_start() {
        let mut s = at_seats(2);
        s.toggle_seat(seat("D4")).unwrap();
        s.reset();
        assert_eq!(s.step(), BookingStep::SelectingTime);
        assert_eq!(s.requested_seat_count(), 1);
        assert!(s.chosen_seats().is_empty());
        assert!(s.showtime().is_none());
    }

    #[test]
    fn view_reports_running_total() {
        let mut s = at_seats(2);
        s.toggle_seat(seat("E7")).unwrap();
        let view = s.summary_view();
        assert_eq!(view.running_total, 150);
        assert_eq!(view.seats_label, "E7");
        assert!(!view.can_confirm);
    }
}
