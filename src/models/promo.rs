use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::BookingError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromoKind {
    /// Доля от (стоимость билетов + сбор), например 0.2
    Percentage,
    /// Фиксированная сумма в рублях/рупиях
    Fixed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromoCode {
    pub code: String,
    pub kind: PromoKind,
    pub value: f64,
    pub description: String,
}

impl PromoCode {
    pub fn percentage(code: &str, value: f64, description: &str) -> Self {
        Self {
            code: code.to_string(),
            kind: PromoKind::Percentage,
            value,
            description: description.to_string(),
        }
    }

    pub fn fixed(code: &str, value: f64, description: &str) -> Self {
        Self {
            code: code.to_string(),
            kind: PromoKind::Fixed,
            value,
            description: description.to_string(),
        }
    }
}

/// Справочник промокодов.
#[derive(Debug, Clone)]
pub struct PromoCatalog {
    codes: HashMap<String, PromoCode>,
}

impl Default for PromoCatalog {
    fn default() -> Self {
        Self::new(vec![
            PromoCode::percentage("MOVIE20", 0.2, "20% off"),
            PromoCode::fixed("FIRST50", 50.0, "₹50 off"),
            PromoCode::percentage("WELCOME10", 0.1, "10% off"),
            PromoCode::percentage("WEEKEND25", 0.25, "25% off"),
            PromoCode::fixed("FLAT100", 100.0, "₹100 off"),
        ])
    }
}

impl PromoCatalog {
    pub fn new(codes: Vec<PromoCode>) -> Self {
        Self {
            codes: codes
                .into_iter()
                .map(|promo| (promo.code.to_uppercase(), promo))
                .collect(),
        }
    }

    /// Ищет промокод без учёта регистра и пробелов по краям.
    pub fn lookup(&self, input: &str) -> Result<&PromoCode, BookingError> {
        let code = input.trim().to_uppercase();
        if code.is_empty() {
            return Err(BookingError::EmptyPromoCode);
        }
        self.codes
            .get(&code)
            .ok_or(BookingError::InvalidPromoCode(code))
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}
