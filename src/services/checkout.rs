//! Состояние страницы оплаты: сводка брони, расчёт цены, промокод и флаг "идёт оплата".

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::error::{BookingError, PaymentError};
use crate::models::booking::BookingSummary;
use crate::models::promo::{PromoCatalog, PromoCode};
use crate::services::pricing::{PriceBreakdown, PricingCalculator};

#[derive(Debug, Clone)]
pub struct Checkout {
    summary: BookingSummary,
    promo: Option<PromoCode>,
    breakdown: PriceBreakdown,
    processing: bool,
    last_activity: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckoutView {
    pub summary: BookingSummary,
    pub seats_label: String,
    pub price: PriceBreakdown,
    pub promo_description: Option<String>,
    pub is_processing: bool,
}

impl Checkout {
    pub fn new(summary: BookingSummary, pricing: &PricingCalculator) -> Self {
        let breakdown = pricing.breakdown(summary.quantity as u32, None);
        Self {
            summary,
            promo: None,
            breakdown,
            processing: false,
            last_activity: Utc::now(),
        }
    }

    /// Страница оплаты без данных брони отправляет пользователя в начало.
    pub fn from_handoff(
        summary: Option<BookingSummary>,
        pricing: &PricingCalculator,
    ) -> Result<Self, PaymentError> {
        summary
            .map(|summary| Self::new(summary, pricing))
            .ok_or(PaymentError::MissingBookingData)
    }

    pub fn summary(&self) -> &BookingSummary {
        &self.summary
    }

    pub fn breakdown(&self) -> &PriceBreakdown {
        &self.breakdown
    }

    pub fn total(&self) -> i64 {
        self.breakdown.total
    }

    pub fn is_processing(&self) -> bool {
        self.processing
    }

    pub fn last_activity(&self) -> DateTime<Utc> {
        self.last_activity
    }

    /// Применяет промокод. Повторное применение заменяет предыдущую скидку.
    pub fn apply_promo(
        &mut self,
        code: &str,
        catalog: &PromoCatalog,
        pricing: &PricingCalculator,
    ) -> Result<&PriceBreakdown, BookingError> {
        let promo = catalog.lookup(code)?.clone();
        self.breakdown = pricing.breakdown(self.summary.quantity as u32, Some(&promo));
        info!(
            "Promo code {} applied to session {}: discount {}",
            promo.code, self.summary.session_id, self.breakdown.discount
        );
        self.promo = Some(promo);
        self.last_activity = Utc::now();
        Ok(&self.breakdown)
    }

    /// Помечает начало оплаты. Вторая попытка во время обработки отклоняется.
    pub fn begin_payment(&mut self) -> Result<i64, PaymentError> {
        if self.processing {
            return Err(PaymentError::AlreadyProcessing);
        }
        self.processing = true;
        self.last_activity = Utc::now();
        Ok(self.breakdown.total)
    }

    pub fn finish_payment(&mut self) {
        self.processing = false;
        self.last_activity = Utc::now();
    }

    pub fn view(&self) -> CheckoutView {
        CheckoutView {
            summary: self.summary.clone(),
            seats_label: self.summary.seats_label(),
            price: self.breakdown.clone(),
            promo_description: self.promo.as_ref().map(|p| p.description.clone()),
            is_processing: self.processing,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::seat::SeatId;
    use uuid::Uuid;

    fn summary(quantity: u8) -> BookingSummary {
        let seats: Vec<SeatId> = (1..=quantity).map(|n| SeatId::new('D', n)).collect();
        BookingSummary {
            session_id: Uuid::new_v4(),
            movie_title: "War 2".to_string(),
            poster_path: None,
            showtime: "9:00 PM".to_string(),
            quantity,
            unit_price: 150,
            subtotal: quantity as i64 * 150,
            seats,
        }
    }

    #[test]
    fn missing_handoff_is_reported() {
        let result = Checkout::from_handoff(None, &PricingCalculator::default());
        assert!(matches!(result, Err(PaymentError::MissingBookingData)));
    }

    #[test]
    fn promo_replaces_previous_discount() {
        let pricing = PricingCalculator::default();
        let catalog = PromoCatalog::default();
        let mut checkout = Checkout::new(summary(3), &pricing);
        assert_eq!(checkout.total(), 566);

        checkout.apply_promo("flat100", &catalog, &pricing).unwrap();
        assert_eq!(checkout.breakdown().discount, 100);

        checkout.apply_promo("WELCOME10", &catalog, &pricing).unwrap();
        assert_eq!(checkout.breakdown().discount, 48);
        assert_eq!(checkout.total(), 566 - 48);
        assert_eq!(checkout.view().promo_description.as_deref(), Some("10% off"));
    }

    #[test]
    fn invalid_promo_keeps_current_price() {
        let pricing = PricingCalculator::default();
        let mut checkout = Checkout::new(summary(1), &pricing);
        let before = checkout.breakdown().clone();
        assert!(checkout.apply_promo("NOPE", &PromoCatalog::default(), &pricing).is_err());
        assert_eq!(checkout.breakdown(), &before);
    }

    #[test]
    fn second_payment_attempt_is_rejected_while_processing() {
        let mut checkout = Checkout::new(summary(2), &PricingCalculator::default());
        assert!(checkout.begin_payment().is_ok());
        assert_eq!(checkout.begin_payment(), Err(PaymentError::AlreadyProcessing));
        checkout.finish_payment();
        assert!(checkout.begin_payment().is_ok());
    }
}
