//! Fetches usage snapshots on mount and whenever the pipeline signals that
//! token consumption may have changed.

use std::sync::{Arc, Mutex};

use tokio::sync::watch;

use crate::api::{AudiobookBackend, UsageSnapshot};

/// What the quota panel renders from.
#[derive(Debug, Default)]
pub struct UsageState {
    /// Last successfully fetched snapshot.  Survives failed refreshes.
    pub snapshot: Option<UsageSnapshot>,
    /// A fetch is outstanding.
    pub loading: bool,
    /// Description of the most recent failure, cleared by the next success.
    pub last_failure: Option<String>,
}

/// Thread-safe handle to [`UsageState`].
pub type SharedUsage = Arc<Mutex<UsageState>>;

pub fn new_shared_usage() -> SharedUsage {
    Arc::new(Mutex::new(UsageState::default()))
}

pub struct UsageMonitor {
    backend: Arc<dyn AudiobookBackend>,
    state: SharedUsage,
    history_days: usize,
}

impl UsageMonitor {
    /// * `history_days` — how many prior days the history list keeps.
    pub fn new(backend: Arc<dyn AudiobookBackend>, state: SharedUsage, history_days: usize) -> Self {
        Self {
            backend,
            state,
            history_days,
        }
    }

    /// Fetch once.  Returns `true` when the displayed snapshot was replaced.
    ///
    /// A failure is logged and recorded in [`UsageState::last_failure`]; the
    /// previous snapshot stays on screen.
    pub async fn refresh(&self) -> bool {
        self.state.lock().unwrap().loading = true;

        let result = self.backend.usage().await;

        let mut st = self.state.lock().unwrap();
        st.loading = false;
        match result {
            Ok(snapshot) => {
                let snapshot = self.trim_history(snapshot);
                log::debug!(
                    "usage: {} / {} tokens today",
                    snapshot.today.total_tokens,
                    snapshot.daily_limit
                );
                st.snapshot = Some(snapshot);
                st.last_failure = None;
                true
            }
            Err(e) => {
                log::warn!("usage: refresh failed, keeping previous snapshot: {e}");
                st.last_failure = Some(e.to_string());
                false
            }
        }
    }

    /// Refresh on start, then once per change of `trigger`, until the
    /// sending side is dropped.
    pub async fn run(self, mut trigger: watch::Receiver<u64>) {
        self.refresh().await;

        while trigger.changed().await.is_ok() {
            let epoch = *trigger.borrow_and_update();
            log::debug!("usage: refresh requested (epoch {epoch})");
            self.refresh().await;
        }

        log::info!("usage: trigger closed, monitor shutting down");
    }

    /// Drop today's own entry from the history and keep the most recent
    /// `history_days` prior days.
    fn trim_history(&self, mut snapshot: UsageSnapshot) -> UsageSnapshot {
        let today = snapshot.today.date_key.clone();
        snapshot.history.retain(|day| day.date_key != today);
        snapshot.history.truncate(self.history_days);
        snapshot
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::api::mock::{rejected, usage_snapshot, MockBackend};
    use crate::api::DailyUsage;

    fn monitor(backend: MockBackend) -> (UsageMonitor, SharedUsage, Arc<MockBackend>) {
        let backend = Arc::new(backend);
        let state = new_shared_usage();
        let m = UsageMonitor::new(backend.clone(), Arc::clone(&state), 7);
        (m, state, backend)
    }

    fn day(date: &str, total: u64) -> DailyUsage {
        DailyUsage {
            date_key: date.into(),
            input_tokens: total,
            output_tokens: 0,
            total_tokens: total,
        }
    }

    #[tokio::test]
    async fn successful_refresh_replaces_snapshot() {
        let (m, state, _) = monitor(MockBackend::happy());

        assert!(m.refresh().await);

        let st = state.lock().unwrap();
        assert_eq!(st.snapshot.as_ref().unwrap().today.total_tokens, 400);
        assert!(!st.loading);
        assert!(st.last_failure.is_none());
    }

    #[tokio::test]
    async fn failed_refresh_keeps_previous_snapshot() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let backend = MockBackend::happy().with_usage(move || {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Ok(usage_snapshot(120, 1000))
            } else {
                Err(rejected("db locked"))
            }
        });
        let (m, state, _) = monitor(backend);

        assert!(m.refresh().await);
        assert!(!m.refresh().await);

        let st = state.lock().unwrap();
        assert_eq!(st.snapshot.as_ref().unwrap().today.total_tokens, 120);
        assert!(st.last_failure.is_some());
        assert!(!st.loading);
    }

    #[tokio::test]
    async fn history_excludes_today_and_is_capped() {
        let backend = MockBackend::happy().with_usage(|| {
            let mut snap = usage_snapshot(50, 1000);
            snap.history = std::iter::once(day("2026-10-18", 50))
                .chain((1..=9).map(|d| day(&format!("2026-10-{:02}", 18 - d), d)))
                .collect();
            Ok(snap)
        });
        let (m, state, _) = monitor(backend);
        m.refresh().await;

        let st = state.lock().unwrap();
        let history = &st.snapshot.as_ref().unwrap().history;
        assert_eq!(history.len(), 7);
        assert_eq!(history[0].date_key, "2026-10-17");
        assert_eq!(history[6].date_key, "2026-10-11");
    }

    #[tokio::test]
    async fn run_refreshes_on_mount_and_on_trigger() {
        let (m, _state, backend) = monitor(MockBackend::happy());
        let (tx, rx) = watch::channel(0u64);

        let handle = tokio::spawn(m.run(rx));
        tx.send(1).unwrap();
        drop(tx);
        handle.await.unwrap();

        assert_eq!(backend.calls(), vec!["usage", "usage"]);
    }

    #[tokio::test]
    async fn run_without_trigger_changes_refreshes_once() {
        let (m, _state, backend) = monitor(MockBackend::happy());
        let (tx, rx) = watch::channel(0u64);
        drop(tx);

        m.run(rx).await;

        assert_eq!(backend.calls(), vec!["usage"]);
    }
}
