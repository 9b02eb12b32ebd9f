/// Current telemetry snapshot, owned by the refresh cycle.
///
/// Refreshes are numbered. Starting a refresh issues a ticket carrying the
/// next generation; completing it applies the result only if no newer
/// refresh has been started since. A slow refresh that is overtaken by a
/// newer one is discarded even if it finishes last.
///
/// A failed refresh keeps the last good snapshot in place. Only when there
/// has never been a good snapshot does the store report data as unavailable.

use crate::logging::{self, DataSource};
use crate::model::{AcquireError, TelemetrySnapshot};
use std::sync::{Arc, Mutex, MutexGuard};

/// Proof that a refresh was started, and which generation it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshTicket {
    generation: u64,
}

impl RefreshTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// What happened to a completed refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The snapshot replaced the previous one.
    Applied,
    /// A newer refresh was started; this result was dropped.
    Superseded,
    /// The refresh failed; the previous snapshot, if any, is kept.
    Failed,
}

/// What consumers should render.
#[derive(Debug, Clone)]
pub enum StoreView {
    /// No refresh has completed yet.
    Loading,
    /// The latest good snapshot. `last_error` is set when the most recent
    /// refresh failed and this snapshot is being retained.
    Ready {
        snapshot: Arc<TelemetrySnapshot>,
        last_error: Option<AcquireError>,
    },
    /// Every refresh so far has failed.
    Unavailable(AcquireError),
}

#[derive(Default)]
struct StoreState {
    issued: u64,
    current: Option<Arc<TelemetrySnapshot>>,
    last_error: Option<AcquireError>,
}

#[derive(Default)]
pub struct TelemetryStore {
    state: Mutex<StoreState>,
}

impl TelemetryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, StoreState> {
        // A panic while holding the lock cannot leave the state half-written.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Starts a refresh, superseding any refresh still in flight.
    pub fn begin_refresh(&self) -> RefreshTicket {
        let mut state = self.state();
        state.issued += 1;
        RefreshTicket { generation: state.issued }
    }

    /// Completes a refresh. The result is applied only if `ticket` is from
    /// the most recently started refresh.
    pub fn complete(
        &self,
        ticket: RefreshTicket,
        result: Result<TelemetrySnapshot, AcquireError>,
    ) -> ApplyOutcome {
        let mut state = self.state();
        if ticket.generation != state.issued {
            logging::debug(
                DataSource::Store,
                None,
                &format!(
                    "discarding refresh #{} (superseded by #{})",
                    ticket.generation, state.issued
                ),
            );
            return ApplyOutcome::Superseded;
        }

        match result {
            Ok(snapshot) => {
                state.current = Some(Arc::new(snapshot));
                state.last_error = None;
                ApplyOutcome::Applied
            }
            Err(err) => {
                let retained = if state.current.is_some() {
                    "keeping last good snapshot"
                } else {
                    "no data available"
                };
                logging::error(DataSource::Store, None, &format!("{}; {}", err, retained));
                state.last_error = Some(err);
                ApplyOutcome::Failed
            }
        }
    }

    /// Runs one refresh end to end: begin, acquire, complete.
    pub fn refresh_with<F>(&self, acquire: F) -> ApplyOutcome
    where
        F: FnOnce() -> Result<TelemetrySnapshot, AcquireError>,
    {
        let ticket = self.begin_refresh();
        self.complete(ticket, acquire())
    }

    /// The latest applied snapshot, if any.
    pub fn current(&self) -> Option<Arc<TelemetrySnapshot>> {
        self.state().current.clone()
    }

    pub fn view(&self) -> StoreView {
        let state = self.state();
        match (&state.current, &state.last_error) {
            (Some(snapshot), last_error) => StoreView::Ready {
                snapshot: Arc::clone(snapshot),
                last_error: last_error.clone(),
            },
            (None, Some(err)) => StoreView::Unavailable(err.clone()),
            (None, None) => StoreView::Loading,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FetchError, SynthesisError};
    use crate::simulate::{synthesize_snapshot, NoJitter};
    use chrono::{TimeZone, Utc};
    use std::sync::mpsc;
    use std::thread;

    fn snapshot_tagged(source: &str) -> TelemetrySnapshot {
        let now = Utc.with_ymd_and_hms(2025, 12, 5, 13, 0, 0).unwrap();
        let mut snapshot = synthesize_snapshot(&mut NoJitter, now).unwrap();
        snapshot.source = source.to_string();
        snapshot
    }

    fn fatal() -> AcquireError {
        AcquireError::Unavailable {
            upstream: FetchError::Http(500),
            synthesis: SynthesisError::MissingBaseline("tarbela".to_string()),
        }
    }

    #[test]
    fn test_new_store_is_loading() {
        let store = TelemetryStore::new();
        assert!(matches!(store.view(), StoreView::Loading));
        assert!(store.current().is_none());
    }

    #[test]
    fn test_generations_increase_monotonically() {
        let store = TelemetryStore::new();
        let a = store.begin_refresh();
        let b = store.begin_refresh();
        assert!(b.generation() > a.generation());
    }

    #[test]
    fn test_stale_refresh_resolving_last_is_discarded() {
        let store = TelemetryStore::new();
        let a = store.begin_refresh();
        let b = store.begin_refresh();

        assert_eq!(store.complete(b, Ok(snapshot_tagged("B"))), ApplyOutcome::Applied);
        assert_eq!(store.complete(a, Ok(snapshot_tagged("A"))), ApplyOutcome::Superseded);
        assert_eq!(store.current().unwrap().source, "B");
    }

    #[test]
    fn test_superseded_refresh_resolving_first_is_discarded() {
        let store = TelemetryStore::new();
        let a = store.begin_refresh();
        let b = store.begin_refresh();

        assert_eq!(store.complete(a, Ok(snapshot_tagged("A"))), ApplyOutcome::Superseded);
        assert!(store.current().is_none());
        assert_eq!(store.complete(b, Ok(snapshot_tagged("B"))), ApplyOutcome::Applied);
        assert_eq!(store.current().unwrap().source, "B");
    }

    #[test]
    fn test_slow_refresh_on_another_thread_cannot_overwrite_newer_data() {
        let store = Arc::new(TelemetryStore::new());
        let (release_a, wait_a) = mpsc::channel::<()>();

        let a = store.begin_refresh();
        let slow = {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                wait_a.recv().unwrap();
                store.complete(a, Ok(snapshot_tagged("A")))
            })
        };

        let b = store.begin_refresh();
        assert_eq!(store.complete(b, Ok(snapshot_tagged("B"))), ApplyOutcome::Applied);

        release_a.send(()).unwrap();
        assert_eq!(slow.join().unwrap(), ApplyOutcome::Superseded);
        assert_eq!(store.current().unwrap().source, "B");
    }

    #[test]
    fn test_failure_keeps_last_good_snapshot() {
        let store = TelemetryStore::new();
        assert_eq!(store.refresh_with(|| Ok(snapshot_tagged("good"))), ApplyOutcome::Applied);
        assert_eq!(store.refresh_with(|| Err(fatal())), ApplyOutcome::Failed);

        match store.view() {
            StoreView::Ready { snapshot, last_error } => {
                assert_eq!(snapshot.source, "good");
                assert_eq!(last_error, Some(fatal()));
            }
            other => panic!("expected retained snapshot, got {:?}", other),
        }
    }

    #[test]
    fn test_failure_without_prior_data_is_unavailable() {
        let store = TelemetryStore::new();
        assert_eq!(store.refresh_with(|| Err(fatal())), ApplyOutcome::Failed);
        assert!(matches!(store.view(), StoreView::Unavailable(_)));
    }

    #[test]
    fn test_success_after_failure_clears_error() {
        let store = TelemetryStore::new();
        store.refresh_with(|| Err(fatal()));
        store.refresh_with(|| Ok(snapshot_tagged("recovered")));
        match store.view() {
            StoreView::Ready { last_error, .. } => assert!(last_error.is_none()),
            other => panic!("expected ready, got {:?}", other),
        }
    }
}
