use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::error::BookingError;

/// Место в зале: буква ряда + номер кресла, например `A5`.
///
/// Порядок сравнения (ряд, номер), поэтому `A2` идёт раньше `A10`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SeatId {
    pub row: char,
    pub number: u8,
}

impl SeatId {
    pub fn new(row: char, number: u8) -> Self {
        Self {
            row: row.to_ascii_uppercase(),
            number,
        }
    }
}

impl fmt::Display for SeatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.row, self.number)
    }
}

impl FromStr for SeatId {
    type Err = BookingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let mut chars = trimmed.chars();
        let row = chars
            .next()
            .filter(|c| c.is_ascii_alphabetic())
            .ok_or_else(|| BookingError::UnknownSeat(s.to_string()))?;

        let number: u8 = chars
            .as_str()
            .parse()
            .map_err(|_| BookingError::UnknownSeat(s.to_string()))?;
        if number == 0 {
            return Err(BookingError::UnknownSeat(s.to_string()));
        }

        Ok(SeatId::new(row, number))
    }
}

impl TryFrom<String> for SeatId {
    type Error = BookingError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SeatId> for String {
    fn from(value: SeatId) -> Self {
        value.to_string()
    }
}

/// Вариант схемы зала.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutVariant {
    /// 10 рядов (A..J) по 12 мест
    #[default]
    Classic,
    /// 6 рядов (A..F) по 8 мест
    Compact,
}

impl FromStr for LayoutVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "classic" => Ok(LayoutVariant::Classic),
            "compact" => Ok(LayoutVariant::Compact),
            other => Err(format!("unknown seat layout '{}'", other)),
        }
    }
}

/// Схема зала с набором заранее занятых мест.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeatLayout {
    rows: u8,
    columns: u8,
    booked: BTreeSet<SeatId>,
}

impl SeatLayout {
    pub fn new(rows: u8, columns: u8, booked: impl IntoIterator<Item = SeatId>) -> Self {
        let rows = rows.min(26);
        Self {
            rows,
            columns,
            booked: booked.into_iter().collect(),
        }
    }

    pub fn classic() -> Self {
        Self::new(10, 12, booked_seats(&["A5", "B6", "C7", "H2", "F10"]))
    }

    pub fn compact() -> Self {
        Self::new(6, 8, booked_seats(&["A3", "B5", "C1", "D8"]))
    }

    pub fn for_variant(variant: LayoutVariant) -> Self {
        match variant {
            LayoutVariant::Classic => Self::classic(),
            LayoutVariant::Compact => Self::compact(),
        }
    }

    pub fn row_labels(&self) -> impl Iterator<Item = char> {
        (0..self.rows).map(|i| (b'A' + i) as char)
    }

    pub fn contains(&self, seat: &SeatId) -> bool {
        let last_row = (b'A' + self.rows.saturating_sub(1)) as char;
        self.rows > 0 && ('A'..=last_row).contains(&seat.row) && (1..=self.columns).contains(&seat.number)
    }

    pub fn is_booked(&self, seat: &SeatId) -> bool {
        self.booked.contains(seat)
    }

    pub fn booked(&self) -> impl Iterator<Item = &SeatId> {
        self.booked.iter()
    }

    /// Строит сетку зала с учётом выбранных пользователем мест.
    pub fn grid(&self, chosen: &BTreeSet<SeatId>) -> Vec<SeatRow> {
        self.row_labels()
            .map(|row| SeatRow {
                label: row,
                seats: (1..=self.columns)
                    .map(|number| {
                        let id = SeatId::new(row, number);
                        let status = if self.is_booked(&id) {
                            SeatStatus::Booked
                        } else if chosen.contains(&id) {
                            SeatStatus::Selected
                        } else {
                            SeatStatus::Available
                        };
                        SeatView { id, status }
                    })
                    .collect(),
            })
            .collect()
    }
}

fn booked_seats(ids: &[&str]) -> Vec<SeatId> {
    ids.iter().filter_map(|id| id.parse().ok()).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SeatStatus {
    Available,
    Selected,
    Booked,
}

#[derive(Debug, Clone, Serialize)]
pub struct SeatView {
    pub id: SeatId,
    pub status: SeatStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct SeatRow {
    pub label: char,
    pub seats: Vec<SeatView>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_normalises_seat_ids() {
        let seat: SeatId = "c12".parse().unwrap();
        assert_eq!(seat, SeatId::new('C', 12));
        assert_eq!(seat.to_string(), "C12");

        assert!("".parse::<SeatId>().is_err());
        assert!("5A".parse::<SeatId>().is_err());
        assert!("A0".parse::<SeatId>().is_err());
        assert!("Ax".parse::<SeatId>().is_err());
    }

    #[test]
    fn ordering_is_numeric_within_row() {
        let mut seats: Vec<SeatId> = ["A10", "B1", "A2"].iter().map(|s| s.parse().unwrap()).collect();
        seats.sort();
        let rendered: Vec<String> = seats.iter().map(ToString::to_string).collect();
        assert_eq!(rendered, vec!["A2", "A10", "B1"]);
    }

    #[test]
    fn classic_layout_bounds_and_booked_seats() {
        let layout = SeatLayout::classic();
        assert!(layout.contains(&SeatId::new('J', 12)));
        assert!(!layout.contains(&SeatId::new('K', 1)));
        assert!(!layout.contains(&SeatId::new('A', 13)));
        assert!(layout.is_booked(&SeatId::new('F', 10)));
        assert_eq!(layout.booked().count(), 5);
    }

    #[test]
    fn compact_layout_grid_marks_statuses() {
        let layout = SeatLayout::compact();
        let chosen: BTreeSet<SeatId> = [SeatId::new('A', 1)].into_iter().collect();
        let grid = layout.grid(&chosen);

        assert_eq!(grid.len(), 6);
        assert!(grid.iter().all(|row| row.seats.len() == 8));
        assert_eq!(grid[0].seats[0].status, SeatStatus::Selected);
        assert_eq!(grid[0].seats[2].status, SeatStatus::Booked);
        assert_eq!(grid[0].seats[1].status, SeatStatus::Available);
    }

    #[test]
    fn seat_id_serializes_as_string() {
        let json = serde_json::to_string(&SeatId::new('H', 2)).unwrap();
        assert_eq!(json, "\"H2\"");
        let back: SeatId = serde_json::from_str("\"h2\"").unwrap();
        assert_eq!(back, SeatId::new('H', 2));
    }
}
