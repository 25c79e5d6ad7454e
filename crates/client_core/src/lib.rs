use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use shared::domain::{AggregateStats, RegistrationRecord, TypeFilter, ViewCriteria};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, warn};

pub mod data_source;
pub mod derive;
pub mod error;

pub use data_source::{
    source_for, AggregationMode, ClientAggregatedSource, DataSource, FetchOutcome,
    ServerAggregatedSource,
};
pub use error::RetrievalError;

/// Where the holder is in its retrieval lifecycle. `Error` still carries the
/// last good data; a blank table only ever means nothing was fetched yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Loading,
    Ready,
    Error,
}

/// The whole observable state as one value, replaced wholesale on every
/// transition. Nothing outside the view model mutates any part of it, which
/// keeps the criteria, the canonical set, and the derived view from ever
/// drifting apart.
#[derive(Debug, Clone, Default)]
pub struct ViewState {
    pub phase: Phase,
    pub criteria: ViewCriteria,
    /// Canonical record set as last received from the data source.
    pub records: Vec<RegistrationRecord>,
    pub stats: AggregateStats,
    /// Filtered, order-preserving subset currently intended for display.
    pub derived: Vec<RegistrationRecord>,
    pub last_error: Option<String>,
}

struct HolderState {
    view: ViewState,
    last_applied_token: u64,
}

/// State holder for the registration dashboard.
///
/// Retrievals are tokenized: each refresh takes the next value from a
/// monotonic counter, and a completion is applied only if its token is newer
/// than the last applied one. Overlapping refreshes therefore settle
/// last-writer-wins by request order, not completion order, and a slow stale
/// response can never clobber a newer one.
pub struct RegistrationViewModel {
    source: Arc<dyn DataSource>,
    inner: Mutex<HolderState>,
    next_token: AtomicU64,
    states: broadcast::Sender<ViewState>,
}

impl RegistrationViewModel {
    pub fn new(source: Arc<dyn DataSource>) -> Arc<Self> {
        let (states, _) = broadcast::channel(64);
        Arc::new(Self {
            source,
            inner: Mutex::new(HolderState {
                view: ViewState::default(),
                last_applied_token: 0,
            }),
            next_token: AtomicU64::new(1),
            states,
        })
    }

    /// Snapshot of the current state.
    pub async fn state(&self) -> ViewState {
        self.inner.lock().await.view.clone()
    }

    /// Every applied transition publishes the new state here.
    pub fn subscribe_states(&self) -> broadcast::Receiver<ViewState> {
        self.states.subscribe()
    }

    /// Run one retrieval against the data source and apply the outcome.
    ///
    /// On failure the canonical records, stats, and the derived view are
    /// retained exactly as last computed; stale data beats a blank table.
    pub async fn refresh(&self) {
        let token = self.next_token.fetch_add(1, Ordering::SeqCst);
        let sort_order = {
            let mut guard = self.inner.lock().await;
            let mut view = guard.view.clone();
            view.phase = Phase::Loading;
            let sort_order = view.criteria.sort_order;
            self.replace(&mut guard, view);
            sort_order
        };

        let outcome = self.source.fetch(sort_order).await;

        let mut guard = self.inner.lock().await;
        if token <= guard.last_applied_token {
            debug!(
                token,
                last_applied = guard.last_applied_token,
                "registrations: dropping stale retrieval outcome"
            );
            return;
        }
        guard.last_applied_token = token;

        let mut view = guard.view.clone();
        match outcome {
            Ok(FetchOutcome { records, stats }) => {
                view.phase = Phase::Ready;
                view.last_error = None;
                view.derived = derive::derive(&records, &view.criteria);
                view.records = records;
                view.stats = stats;
            }
            Err(err) => {
                warn!(error = %err, "registrations: retrieval failed");
                view.phase = Phase::Error;
                view.last_error = Some(err.to_string());
            }
        }
        self.replace(&mut guard, view);
    }

    /// Recomputes the derived view locally; no retrieval.
    pub async fn set_type_filter(&self, type_filter: TypeFilter) {
        self.apply_criteria(|criteria| criteria.type_filter = type_filter)
            .await;
    }

    /// Recomputes the derived view locally; no retrieval.
    pub async fn set_search_text(&self, search_text: impl Into<String>) {
        let search_text = search_text.into();
        self.apply_criteria(move |criteria| criteria.search_text = search_text)
            .await;
    }

    /// Ordering is established at fetch time in both aggregation variants,
    /// so flipping the sort order is behaviorally a refresh request.
    pub async fn toggle_sort_order(&self) {
        {
            let mut guard = self.inner.lock().await;
            let mut view = guard.view.clone();
            view.criteria.sort_order = view.criteria.sort_order.toggled();
            self.replace(&mut guard, view);
        }
        self.refresh().await;
    }

    async fn apply_criteria(&self, apply: impl FnOnce(&mut ViewCriteria)) {
        let mut guard = self.inner.lock().await;
        let mut view = guard.view.clone();
        apply(&mut view.criteria);
        view.derived = derive::derive(&view.records, &view.criteria);
        self.replace(&mut guard, view);
    }

    fn replace(&self, guard: &mut HolderState, view: ViewState) {
        guard.view = view;
        let _ = self.states.send(guard.view.clone());
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
