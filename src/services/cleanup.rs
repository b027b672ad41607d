use chrono::{DateTime, TimeDelta, Utc};
use std::sync::Arc;
use tracing::{debug, info};

use crate::AppState;

pub struct CleanupService {
    state: Arc<AppState>,
}

impl CleanupService {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    /// Запускает полную очистку: сессии + страницы оплаты + передачи + кеш каталога
    pub async fn run_full_cleanup(&self) -> CleanupStats {
        info!("🧹 Starting full cleanup process");
        let stats = self.sweep(Utc::now());

        if stats.total_items_cleaned() == 0 {
            debug!("🧹 Nothing to clean up");
        } else {
            info!(
                "✅ Cleanup completed: {} sessions, {} checkouts, {} handoffs, {} cache entries",
                stats.idle_sessions, stats.idle_checkouts, stats.orphaned_handoffs, stats.expired_cache
            );
        }
        stats
    }

    /// Один проход очистки относительно момента `now`.
    pub fn sweep(&self, now: DateTime<Utc>) -> CleanupStats {
        let cutoff = now - TimeDelta::minutes(self.state.config.booking.session_idle_minutes.max(1));

        let idle_checkouts = self.cleanup_idle_checkouts(cutoff);
        let idle_sessions = self.cleanup_idle_sessions(cutoff);
        let orphaned_handoffs = self.cleanup_orphaned_handoffs();
        let expired_cache = self.state.cache.purge_expired();

        CleanupStats {
            idle_sessions,
            idle_checkouts,
            orphaned_handoffs,
            expired_cache,
        }
    }

    /// Страницы оплаты без активности. Идущий платёж не трогаем.
    fn cleanup_idle_checkouts(&self, cutoff: DateTime<Utc>) -> usize {
        let mut removed = 0;
        self.state.checkouts.retain(|_, checkout| {
            let keep = checkout.is_processing() || checkout.last_activity() > cutoff;
            if !keep {
                removed += 1;
            }
            keep
        });
        removed
    }

    /// Сессии мастера без активности, если по ним не идёт оплата.
    fn cleanup_idle_sessions(&self, cutoff: DateTime<Utc>) -> usize {
        let checkouts = &self.state.checkouts;
        let mut removed = 0;
        self.state.sessions.retain(|id, session| {
            let keep = session.last_activity() > cutoff || checkouts.contains_key(id);
            if !keep {
                removed += 1;
            }
            keep
        });
        removed
    }

    /// Передачи, у которых не осталось ни сессии, ни страницы оплаты.
    fn cleanup_orphaned_handoffs(&self) -> usize {
        let sessions = &self.state.sessions;
        let checkouts = &self.state.checkouts;
        self.state
            .handoffs
            .retain(|id| sessions.contains_key(&id) || checkouts.contains_key(&id))
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CleanupStats {
    pub idle_sessions: usize,
    pub idle_checkouts: usize,
    pub orphaned_handoffs: usize,
    pub expired_cache: usize,
}

impl CleanupStats {
    pub fn total_items_cleaned(&self) -> usize {
        self.idle_sessions + self.idle_checkouts + self.orphaned_handoffs + self.expired_cache
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::services::checkout::Checkout;

    fn state() -> Arc<AppState> {
        AppState::new(Config::default()).unwrap()
    }

    fn confirmed_session(state: &AppState) -> uuid::Uuid {
        let mut session = state.new_session("Saiyaara", None);
        session.select_time("3:00 PM").unwrap();
        session.confirm_quantity().unwrap();
        session.toggle_seat("E4".parse().unwrap()).unwrap();
        let summary = session.confirm().unwrap();
        let id = session.id();
        state.handoffs.save(&summary).unwrap();
        state.sessions.insert(id, session);
        id
    }

    #[test]
    fn fresh_state_is_kept() {
        let state = state();
        let id = confirmed_session(&state);
        let stats = CleanupService::new(state.clone()).sweep(Utc::now());

        assert_eq!(stats.total_items_cleaned(), 0);
        assert!(state.sessions.contains_key(&id));
        assert!(state.handoffs.contains(id));
    }

    #[test]
    fn idle_sessions_and_their_handoffs_are_dropped() {
        let state = state();
        let id = confirmed_session(&state);
        let later = Utc::now() + TimeDelta::minutes(31);
        let stats = CleanupService::new(state.clone()).sweep(later);

        assert_eq!(stats.idle_sessions, 1);
        assert_eq!(stats.orphaned_handoffs, 1);
        assert!(state.sessions.is_empty());
        assert!(!state.handoffs.contains(id));
    }

    #[test]
    fn payment_in_flight_is_never_swept() {
        let state = state();
        let id = confirmed_session(&state);
        let summary = state.handoffs.load(id).unwrap();
        let mut checkout = Checkout::new(summary, &state.pricing);
        checkout.begin_payment().unwrap();
        state.checkouts.insert(id, checkout);

        let later = Utc::now() + TimeDelta::hours(3);
        let stats = CleanupService::new(state.clone()).sweep(later);

        assert_eq!(stats.total_items_cleaned(), 0);
        assert!(state.checkouts.contains_key(&id));
        assert!(state.sessions.contains_key(&id));
        assert!(state.handoffs.contains(id));
    }

    #[test]
    fn sweep_during_concurrent_bookings_never_underflows() {
        let state = state();
        let later = Utc::now() + TimeDelta::hours(1);
        let cleanup = CleanupService::new(state.clone());

        let swept = std::thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| {
                    for _ in 0..1_000 {
                        let session = state.new_session("Kantara", None);
                        state.sessions.insert(session.id(), session);
                    }
                });
            }
            (0..200).map(|_| cleanup.sweep(later).idle_sessions).sum::<usize>()
        });

        assert_eq!(swept + state.sessions.len(), 4_000);
    }
}
