//! payment.rs
//!
//! Имитация платёжного шлюза.
//!
//! Ключевые компоненты:
//! 1.  **CancelToken**: Токен отмены на базе `tokio::sync::watch`. Позволяет прервать
//!     ожидание ответа шлюза, если пользователь ушёл со страницы оплаты.
//! 2.  **MockPaymentGateway**: Проверяет платёжную форму, выжидает заданную задержку и
//!     с заданной вероятностью одобряет платёж.
//! 3.  **PaymentOutcome**: Результат обработки - одобрено (с квитанцией) или отклонено.
//!     Отклонение не является ошибкой: сессия сохраняется для повторной попытки.

use chrono::{DateTime, Utc};
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tokio::time::Duration;
use tracing::{info, warn};

use crate::config::PaymentConfig;
use crate::error::PaymentError;
use crate::models::booking::{generate_booking_id, BookingSummary, PaymentReceipt};
use crate::models::payment::PaymentMethod;

/// Токен отмены. Клоны разделяют один и тот же флаг.
#[derive(Debug, Clone)]
pub struct CancelToken {
    sender: Arc<watch::Sender<bool>>,
    receiver: watch::Receiver<bool>,
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelToken {
    pub fn new() -> Self {
        let (sender, receiver) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
            receiver,
        }
    }

    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Завершается, когда токен отменён.
    pub async fn cancelled(&self) {
        let mut receiver = self.receiver.clone();
        // Отправитель живёт, пока жив любой клон токена, поэтому ошибки здесь не бывает
        let _ = receiver.wait_for(|cancelled| *cancelled).await;
    }
}

/// Запрос на оплату: итоговая сумма, сводка брони и способ оплаты.
#[derive(Debug, Clone)]
pub struct PaymentRequest {
    pub amount: i64,
    pub summary: BookingSummary,
    pub method: PaymentMethod,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PaymentOutcome {
    Approved(PaymentReceipt),
    Declined,
}

/// Имитация шлюза: задержка + случайное одобрение.
#[derive(Debug)]
pub struct MockPaymentGateway {
    /// Сколько "думает" шлюз перед ответом.
    processing_delay: Duration,
    /// Вероятность одобрения платежа, 0.0..=1.0.
    success_rate: f64,
    /// Генератор для решения об одобрении и номера брони.
    rng: Mutex<StdRng>,
}

impl MockPaymentGateway {
    pub fn new(processing_delay: Duration, success_rate: f64) -> Self {
        Self {
            processing_delay,
            success_rate: success_rate.clamp(0.0, 1.0),
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Создает шлюз на основе настроек приложения.
    pub fn from_config(config: &PaymentConfig) -> Self {
        Self::new(
            Duration::from_millis(config.processing_delay_ms),
            config.success_rate,
        )
    }

    /// Детерминированный генератор для тестов и воспроизводимых прогонов.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Mutex::new(StdRng::seed_from_u64(seed));
        self
    }

    fn draw(&self, now: DateTime<Utc>) -> (bool, String) {
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let approved = rng.gen_bool(self.success_rate);
        (approved, generate_booking_id(now, &mut *rng))
    }

    /// Обрабатывает платёж.
    ///
    /// Ошибка валидации возвращается сразу, без задержки. Отмена токена во время
    /// ожидания даёт `PaymentError::Cancelled`.
    pub async fn process(
        &self,
        request: PaymentRequest,
        cancel: CancelToken,
    ) -> Result<PaymentOutcome, PaymentError> {
        let now = Utc::now();
        request.method.validate(now.date_naive())?;

        info!(
            "Processing payment: method={}, amount={}, movie='{}', seats=[{}]",
            request.method.kind(),
            request.amount,
            request.summary.movie_title,
            request.summary.seats_label()
        );

        tokio::select! {
            _ = tokio::time::sleep(self.processing_delay) => {}
            _ = cancel.cancelled() => {
                warn!("Payment for session {} cancelled", request.summary.session_id);
                return Err(PaymentError::Cancelled);
            }
        }

        let (approved, booking_id) = self.draw(Utc::now());
        if !approved {
            warn!("Payment declined for session {}", request.summary.session_id);
            return Ok(PaymentOutcome::Declined);
        }

        let receipt = PaymentReceipt {
            booking_id,
            movie_title: request.summary.movie_title.clone(),
            poster_path: request.summary.poster_path.clone(),
            showtime: request.summary.showtime.clone(),
            seats: request.summary.seats_label(),
            quantity: request.summary.quantity,
            amount: request.amount,
            payment_method: request.method.kind().to_string(),
            timestamp: Utc::now(),
        };
        info!("Payment approved: booking {} amount {}", receipt.booking_id, receipt.amount);
        Ok(PaymentOutcome::Approved(receipt))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::payment::UpiDetails;
    use crate::models::seat::SeatId;
    use uuid::Uuid;

    fn request(method: PaymentMethod) -> PaymentRequest {
        PaymentRequest {
            amount: 566,
            summary: BookingSummary {
                session_id: Uuid::new_v4(),
                movie_title: "Saiyaara".to_string(),
                poster_path: None,
                showtime: "3:00 PM".to_string(),
                seats: vec![SeatId::new('A', 1), SeatId::new('A', 2), SeatId::new('A', 3)],
                quantity: 3,
                unit_price: 150,
                subtotal: 450,
            },
            method,
        }
    }

    fn upi() -> PaymentMethod {
        PaymentMethod::Upi(UpiDetails {
            upi_id: Some("jane@upi".to_string()),
            app: None,
        })
    }

    #[tokio::test(start_paused = true)]
    async fn always_approving_gateway_issues_receipt() {
        let gateway = MockPaymentGateway::new(Duration::from_millis(3000), 1.0).with_seed(1);
        let outcome = gateway.process(request(upi()), CancelToken::new()).await.unwrap();
        match outcome {
            PaymentOutcome::Approved(receipt) => {
                assert_eq!(receipt.amount, 566);
                assert_eq!(receipt.seats, "A1, A2, A3");
                assert_eq!(receipt.payment_method, "upi");
                assert!(receipt.booking_id.starts_with("BK"));
            }
            PaymentOutcome::Declined => panic!("expected approval"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn never_approving_gateway_declines() {
        let gateway = MockPaymentGateway::new(Duration::from_millis(10), 0.0);
        let outcome = gateway.process(request(upi()), CancelToken::new()).await.unwrap();
        assert_eq!(outcome, PaymentOutcome::Declined);
    }

    #[tokio::test]
    async fn invalid_form_fails_before_waiting() {
        let gateway = MockPaymentGateway::new(Duration::from_secs(3600), 1.0);
        let result = gateway
            .process(request(PaymentMethod::Wallet { wallet: None }), CancelToken::new())
            .await;
        assert_eq!(
            result,
            Err(PaymentError::Validation("Please select a wallet".to_string()))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_token_aborts_pending_payment() {
        let gateway = Arc::new(MockPaymentGateway::new(Duration::from_secs(60), 1.0));
        let token = CancelToken::new();

        let task = {
            let gateway = gateway.clone();
            let token = token.clone();
            tokio::spawn(async move { gateway.process(request(upi()), token).await })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        token.cancel();
        assert!(token.is_cancelled());

        let result = task.await.unwrap();
        assert_eq!(result, Err(PaymentError::Cancelled));
    }
}
