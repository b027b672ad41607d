//! circuit_breaker.rs
//!
//! Паттерн "Автоматический выключатель" для запросов к внешнему каталогу фильмов.
//! После серии сбоев подряд запросы блокируются на время таймаута, затем
//! пропускается один пробный запрос.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, RwLock};
use tokio::time::{Duration, Instant};
use tracing::{error, info, warn};

/// Состояния "Автоматического выключателя" (Circuit Breaker).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// **Closed (Замкнуто)**: Нормальный режим работы. Запросы разрешены.
    Closed,
    /// **Open (Разомкнуто)**: Запросы временно запрещены после множественных сбоев.
    Open,
    /// **HalfOpen (Полуоткрыто)**: После таймаута разрешается пробный запрос.
    HalfOpen,
}

#[derive(Debug)]
pub struct CircuitBreaker {
    /// Текущее состояние (Closed, Open, HalfOpen).
    state: RwLock<CircuitState>,
    /// Счетчик последовательных сбоев.
    failure_count: AtomicU32,
    /// Момент последнего сбоя для расчета таймаута.
    last_failure: Mutex<Option<Instant>>,
    /// Порог сбоев, после которого выключатель переходит в состояние Open.
    failure_threshold: u32,
    /// Длительность таймаута в состоянии Open.
    timeout_duration: Duration,
}

impl CircuitBreaker {
    pub fn new(failure_threshold: u32, timeout_seconds: u64) -> Self {
        Self {
            state: RwLock::new(CircuitState::Closed),
            failure_count: AtomicU32::new(0),
            last_failure: Mutex::new(None),
            failure_threshold: failure_threshold.max(1),
            timeout_duration: Duration::from_secs(timeout_seconds),
        }
    }

    fn read_state(&self) -> CircuitState {
        *self.state.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_state(&self, next: CircuitState) {
        *self.state.write().unwrap_or_else(|poisoned| poisoned.into_inner()) = next;
    }

    /// Проверяет, можно ли выполнить следующий запрос.
    pub fn can_execute(&self) -> bool {
        match self.read_state() {
            CircuitState::Closed | CircuitState::HalfOpen => true,
            CircuitState::Open => {
                let last_failure = *self
                    .last_failure
                    .lock()
                    .unwrap_or_else(|poisoned| poisoned.into_inner());
                let expired = last_failure
                    .map(|at| at.elapsed() >= self.timeout_duration)
                    .unwrap_or(true);
                if expired {
                    self.write_state(CircuitState::HalfOpen);
                    info!("Circuit breaker transitioning to HalfOpen state");
                }
                expired
            }
        }
    }

    pub fn record_success(&self) {
        if self.read_state() == CircuitState::HalfOpen {
            self.write_state(CircuitState::Closed);
            info!("Circuit breaker recovered - transitioning to Closed state");
        }
        self.failure_count.store(0, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        let failure_count = self.failure_count.fetch_add(1, Ordering::Relaxed) + 1;
        *self
            .last_failure
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(Instant::now());

        match self.read_state() {
            CircuitState::Closed if failure_count >= self.failure_threshold => {
                self.write_state(CircuitState::Open);
                error!(
                    "Circuit breaker OPENED - {} failures reached threshold {}",
                    failure_count, self.failure_threshold
                );
            }
            CircuitState::HalfOpen => {
                self.write_state(CircuitState::Open);
                warn!("Circuit breaker test failed - returning to Open state");
            }
            _ => {}
        }
    }

    /// Текущее состояние и число сбоев подряд, для мониторинга.
    pub fn status(&self) -> (CircuitState, u32) {
        (self.read_state(), self.failure_count.load(Ordering::Relaxed))
    }
}
