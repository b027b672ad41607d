//! pricing.rs
//!
//! Расчёт стоимости заказа: билеты + сервисный сбор + налог - скидка по промокоду.
//!
//! Все суммы целые (без копеек). Налог и процентная скидка округляются до ближайшей
//! единицы, половина округляется от нуля. Налог считается с (билеты + сбор) до скидки.
//! Скидка не может опустить (билеты + сбор) ниже порога `floor`.

use serde::Serialize;

use crate::config::PricingConfig;
use crate::models::promo::{PromoCode, PromoKind};

/// Порог, ниже которого скидка не опускает (билеты + сбор).
pub const DEFAULT_DISCOUNT_FLOOR: i64 = 50;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PriceBreakdown {
    pub seat_count: u32,
    pub unit_price: i64,
    pub subtotal: i64,
    pub convenience_fee: i64,
    pub tax: i64,
    pub discount: i64,
    pub total: i64,
    pub promo_code: Option<String>,
}

fn round_to_unit(value: f64) -> i64 {
    value.round() as i64
}

/// Чистая функция расчёта с порогом скидки по умолчанию.
pub fn compute(
    seat_count: u32,
    unit_price: i64,
    fee: i64,
    tax_rate: f64,
    promo: Option<&PromoCode>,
) -> PriceBreakdown {
    compute_with_floor(seat_count, unit_price, fee, tax_rate, DEFAULT_DISCOUNT_FLOOR, promo)
}

pub fn compute_with_floor(
    seat_count: u32,
    unit_price: i64,
    fee: i64,
    tax_rate: f64,
    floor: i64,
    promo: Option<&PromoCode>,
) -> PriceBreakdown {
    let subtotal = seat_count as i64 * unit_price;
    let base = subtotal + fee;
    let tax = round_to_unit(base as f64 * tax_rate);

    let discount = promo
        .map(|promo| {
            let raw = match promo.kind {
                PromoKind::Percentage => round_to_unit(base as f64 * promo.value),
                PromoKind::Fixed => round_to_unit(promo.value),
            };
            raw.min(base - floor).max(0)
        })
        .unwrap_or(0);

    PriceBreakdown {
        seat_count,
        unit_price,
        subtotal,
        convenience_fee: fee,
        tax,
        discount,
        total: base + tax - discount,
        promo_code: promo.map(|p| p.code.clone()),
    }
}

/// Калькулятор с ценами из конфигурации.
#[derive(Debug, Clone)]
pub struct PricingCalculator {
    unit_price: i64,
    fee: i64,
    tax_rate: f64,
    floor: i64,
}

impl Default for PricingCalculator {
    fn default() -> Self {
        Self::from_config(&PricingConfig::default())
    }
}

impl PricingCalculator {
    pub fn from_config(config: &PricingConfig) -> Self {
        Self {
            unit_price: config.ticket_price,
            fee: config.convenience_fee,
            tax_rate: config.tax_rate,
            floor: config.discount_floor,
        }
    }

    pub fn unit_price(&self) -> i64 {
        self.unit_price
    }

    pub fn breakdown(&self, seat_count: u32, promo: Option<&PromoCode>) -> PriceBreakdown {
        compute_with_floor(seat_count, self.unit_price, self.fee, self.tax_rate, self.floor, promo)
    }
}

/// `₹566`
pub fn format_amount(amount: i64) -> String {
    format!("₹{}", amount)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn three_seats_without_promo() {
        let price = compute(3, 150, 30, 0.18, None);
        assert_eq!(price.subtotal, 450);
        assert_eq!(price.tax, 86);
        assert_eq!(price.discount, 0);
        assert_eq!(price.total, 566);
        assert_eq!(format_amount(price.total), "₹566");
    }

    #[test]
    fn flat_promo_is_capped_by_floor() {
        let flat = PromoCode::fixed("FLAT100", 100.0, "₹100 off");
        let price = compute(3, 150, 30, 0.18, Some(&flat));
        assert_eq!(price.discount, 100);
        assert_eq!(price.total, 466);
        assert_eq!(price.promo_code.as_deref(), Some("FLAT100"));

        // 1 билет: база 180, скидка 100 укладывается; при цене 20 база 50 - скидки нет
        let cheap = compute(1, 20, 30, 0.18, Some(&flat));
        assert_eq!(cheap.discount, 0);
        let small = compute(1, 60, 30, 0.18, Some(&flat));
        assert_eq!(small.discount, 40);
    }

    #[test]
    fn percentage_promo_applies_to_subtotal_and_fee() {
        let promo = PromoCode::percentage("MOVIE20", 0.2, "20% off");
        let price = compute(2, 150, 30, 0.18, Some(&promo));
        // база 330, налог 59.4 -> 59, скидка 66
        assert_eq!(price.tax, 59);
        assert_eq!(price.discount, 66);
        assert_eq!(price.total, 330 + 59 - 66);
    }

    #[test]
    fn half_units_round_away_from_zero() {
        // база 25 * 0.5 = 12.5 -> 13
        let price = compute_with_floor(0, 0, 25, 0.5, 0, None);
        assert_eq!(price.tax, 13);
    }

    #[test]
    fn calculator_uses_configured_prices() {
        let calc = PricingCalculator::from_config(&PricingConfig {
            ticket_price: 250,
            convenience_fee: 0,
            tax_rate: 0.0,
            discount_floor: 0,
        });
        let price = calc.breakdown(4, None);
        assert_eq!(price.total, 1000);
        assert_eq!(calc.unit_price(), 250);
    }
}
