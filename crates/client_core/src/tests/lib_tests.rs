use std::collections::VecDeque;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use shared::domain::{RecordId, RegistrationType, SortOrder};
use tokio::sync::oneshot;

use super::*;

fn timestamp(minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 9, minute, 0).unwrap()
}

fn record(name: &str, registration_type: &str, minute: u32) -> RegistrationRecord {
    let email = format!("{}@example.org", name.to_lowercase().replace(' ', "."));
    let created_at = timestamp(minute);
    RegistrationRecord {
        id: RecordId::derive(name, &email, created_at),
        name: name.to_string(),
        email,
        registration_type: RegistrationType::from(registration_type.to_string()),
        company: None,
        phone: None,
        created_at,
    }
}

fn ten_records() -> Vec<RegistrationRecord> {
    (0..10)
        .map(|index| {
            let registration_type = if index % 2 == 0 { "student" } else { "professional" };
            record(&format!("Person {index}"), registration_type, index)
        })
        .collect()
}

fn outcome_of(records: Vec<RegistrationRecord>) -> FetchOutcome {
    let stats = AggregateStats::tally(&records);
    FetchOutcome { records, stats }
}

struct ScriptedSource {
    outcomes: Mutex<VecDeque<Result<FetchOutcome, String>>>,
    fetches: AtomicU64,
}

impl ScriptedSource {
    fn new(outcomes: Vec<Result<FetchOutcome, String>>) -> Arc<Self> {
        Arc::new(Self {
            outcomes: Mutex::new(outcomes.into()),
            fetches: AtomicU64::new(0),
        })
    }

    fn fetches(&self) -> u64 {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DataSource for ScriptedSource {
    async fn fetch(&self, _sort: SortOrder) -> Result<FetchOutcome, RetrievalError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        match self.outcomes.lock().await.pop_front() {
            Some(Ok(outcome)) => Ok(outcome),
            Some(Err(message)) => Err(RetrievalError::Payload(message)),
            None => Ok(FetchOutcome::default()),
        }
    }
}

/// Fake data source that honors the requested ordering the way both real
/// variants do: sorting happens at fetch time, never afterwards.
struct SortingSource {
    records: Vec<RegistrationRecord>,
    requested: Mutex<Vec<SortOrder>>,
}

#[async_trait]
impl DataSource for SortingSource {
    async fn fetch(&self, sort: SortOrder) -> Result<FetchOutcome, RetrievalError> {
        self.requested.lock().await.push(sort);
        let mut records = self.records.clone();
        match sort {
            SortOrder::Ascending => records.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
            SortOrder::Descending => records.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        }
        Ok(outcome_of(records))
    }
}

struct GatedCall {
    started: oneshot::Sender<()>,
    gate: oneshot::Receiver<()>,
    outcome: FetchOutcome,
}

struct GatedSource {
    calls: Mutex<VecDeque<GatedCall>>,
}

#[async_trait]
impl DataSource for GatedSource {
    async fn fetch(&self, _sort: SortOrder) -> Result<FetchOutcome, RetrievalError> {
        let call = self
            .calls
            .lock()
            .await
            .pop_front()
            .expect("unscripted fetch");
        let _ = call.started.send(());
        let _ = call.gate.await;
        Ok(call.outcome)
    }
}

#[tokio::test]
async fn initial_state_is_idle_and_empty() {
    let model = RegistrationViewModel::new(ScriptedSource::new(Vec::new()));
    let state = model.state().await;
    assert_eq!(state.phase, Phase::Idle);
    assert!(state.records.is_empty());
    assert!(state.derived.is_empty());
    assert_eq!(state.stats, AggregateStats::default());
    assert_eq!(state.last_error, None);
}

#[tokio::test]
async fn refresh_publishes_loading_then_ready() {
    let source = ScriptedSource::new(vec![Ok(outcome_of(ten_records()))]);
    let model = RegistrationViewModel::new(source);
    let mut states = model.subscribe_states();

    model.refresh().await;

    let loading = states.recv().await.expect("loading state");
    assert_eq!(loading.phase, Phase::Loading);

    let ready = states.recv().await.expect("ready state");
    assert_eq!(ready.phase, Phase::Ready);
    assert_eq!(ready.records.len(), 10);
    assert_eq!(ready.derived.len(), 10);
    assert_eq!(ready.stats.total, 10);
    assert_eq!(ready.last_error, None);
}

#[tokio::test]
async fn failed_refresh_retains_cached_records_and_derived_view() {
    let cached = ten_records();
    let source = ScriptedSource::new(vec![
        Ok(outcome_of(cached.clone())),
        Err("connection reset".to_string()),
    ]);
    let model = RegistrationViewModel::new(source);

    model.refresh().await;
    let before = model.state().await;
    assert_eq!(before.phase, Phase::Ready);

    model.refresh().await;
    let after = model.state().await;
    assert_eq!(after.phase, Phase::Error);
    assert!(after.last_error.is_some());
    assert_eq!(after.records, cached);
    assert_eq!(after.derived, before.derived);
    assert_eq!(after.stats, before.stats);
}

#[tokio::test]
async fn criteria_changes_recompute_without_a_new_retrieval() {
    let source = ScriptedSource::new(vec![Ok(outcome_of(ten_records()))]);
    let model = RegistrationViewModel::new(Arc::clone(&source) as Arc<dyn DataSource>);

    model.refresh().await;
    model.set_type_filter(TypeFilter::Student).await;

    let state = model.state().await;
    assert_eq!(state.phase, Phase::Ready);
    assert_eq!(state.derived.len(), 5);
    assert!(state
        .derived
        .iter()
        .all(|record| record.registration_type == RegistrationType::Student));
    assert_eq!(state.records.len(), 10);

    model.set_search_text("person 2").await;
    let state = model.state().await;
    assert_eq!(state.derived.len(), 1);
    assert_eq!(state.derived[0].name, "Person 2");

    assert_eq!(source.fetches(), 1);
}

#[tokio::test]
async fn criteria_changes_apply_to_stale_data_after_a_failure() {
    let source = ScriptedSource::new(vec![
        Ok(outcome_of(ten_records())),
        Err("gateway timeout".to_string()),
    ]);
    let model = RegistrationViewModel::new(source);

    model.refresh().await;
    model.refresh().await;
    assert_eq!(model.state().await.phase, Phase::Error);

    model.set_search_text("person 7").await;
    let state = model.state().await;
    assert_eq!(state.derived.len(), 1);
    assert_eq!(state.derived[0].name, "Person 7");
    assert_eq!(state.records.len(), 10);
}

#[tokio::test]
async fn toggle_sort_order_refetches_and_double_toggle_restores_ordering() {
    let source = Arc::new(SortingSource {
        records: ten_records(),
        requested: Mutex::new(Vec::new()),
    });
    let model = RegistrationViewModel::new(Arc::clone(&source) as Arc<dyn DataSource>);

    model.refresh().await;
    let original: Vec<String> = model
        .state()
        .await
        .records
        .iter()
        .map(|record| record.name.clone())
        .collect();

    model.toggle_sort_order().await;
    let flipped: Vec<String> = model
        .state()
        .await
        .records
        .iter()
        .map(|record| record.name.clone())
        .collect();
    assert_ne!(flipped, original);

    model.toggle_sort_order().await;
    let restored: Vec<String> = model
        .state()
        .await
        .records
        .iter()
        .map(|record| record.name.clone())
        .collect();
    assert_eq!(restored, original);

    let requested = source.requested.lock().await.clone();
    assert_eq!(
        requested,
        [
            SortOrder::Descending,
            SortOrder::Ascending,
            SortOrder::Descending,
        ]
    );
}

#[tokio::test]
async fn stale_retrieval_outcome_is_discarded() {
    let (started1_tx, started1_rx) = oneshot::channel();
    let (gate1_tx, gate1_rx) = oneshot::channel();
    let (started2_tx, started2_rx) = oneshot::channel();
    let (gate2_tx, gate2_rx) = oneshot::channel();

    let source = Arc::new(GatedSource {
        calls: Mutex::new(VecDeque::from([
            GatedCall {
                started: started1_tx,
                gate: gate1_rx,
                outcome: outcome_of(vec![record("Stale Response", "student", 0)]),
            },
            GatedCall {
                started: started2_tx,
                gate: gate2_rx,
                outcome: outcome_of(vec![record("Fresh Response", "student", 1)]),
            },
        ])),
    });
    let model = RegistrationViewModel::new(Arc::clone(&source) as Arc<dyn DataSource>);

    let first = tokio::spawn({
        let model = Arc::clone(&model);
        async move { model.refresh().await }
    });
    started1_rx.await.expect("first retrieval started");

    let second = tokio::spawn({
        let model = Arc::clone(&model);
        async move { model.refresh().await }
    });
    started2_rx.await.expect("second retrieval started");

    // let the newer request settle first, then release the older one
    gate2_tx.send(()).expect("release second");
    second.await.expect("second refresh");
    gate1_tx.send(()).expect("release first");
    first.await.expect("first refresh");

    let state = model.state().await;
    assert_eq!(state.phase, Phase::Ready);
    assert_eq!(state.records.len(), 1);
    assert_eq!(state.records[0].name, "Fresh Response");
}
