//! Integration tests for the registration loop.
//!
//! A scripted connector wraps the in-memory store so connection and write
//! failures can be injected at exact points. Time is paused, so backoff and
//! interval sleeps complete instantly while their lengths stay observable.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

use system_monitor::collectors::filesystem::PartitionReading;
use system_monitor::{
    Connector, HostIdentity, HostProbe, MemoryStore, Registrar, RegistrationError,
    RegistrationPolicy, SnapshotBuilder, Store, StoreError,
};

const IP: &str = "10.1.2.3";
const PRIMING_SAMPLE: f64 = 0.0;
const SAMPLE_WINDOW: Duration = Duration::from_millis(100);

/// Shared record of everything the loop did against the store.
#[derive(Clone, Default)]
struct Script {
    connects: Arc<Mutex<VecDeque<Result<(), StoreError>>>>,
    upserts: Arc<Mutex<VecDeque<Result<(), StoreError>>>>,
    connect_times: Arc<Mutex<Vec<Instant>>>,
    upsert_times: Arc<Mutex<Vec<Instant>>>,
    connect_calls: Arc<AtomicUsize>,
    upsert_calls: Arc<AtomicUsize>,
    closes: Arc<AtomicUsize>,
}

impl Script {
    fn connects(self, outcomes: Vec<Result<(), StoreError>>) -> Self {
        *self.connects.lock().unwrap() = outcomes.into();
        self
    }

    fn upserts(self, outcomes: Vec<Result<(), StoreError>>) -> Self {
        *self.upserts.lock().unwrap() = outcomes.into();
        self
    }

    fn connect_times(&self) -> Vec<Instant> {
        self.connect_times.lock().unwrap().clone()
    }

    fn upsert_times(&self) -> Vec<Instant> {
        self.upsert_times.lock().unwrap().clone()
    }
}

/// Pops the next scripted outcome; an exhausted script succeeds.
fn next_outcome(queue: &Mutex<VecDeque<Result<(), StoreError>>>) -> Result<(), StoreError> {
    queue.lock().unwrap().pop_front().unwrap_or(Ok(()))
}

struct ScriptedConnector {
    script: Script,
    store: MemoryStore,
}

struct ScriptedConn {
    script: Script,
    store: MemoryStore,
}

#[async_trait]
impl Connector for ScriptedConnector {
    type Conn = ScriptedConn;

    async fn connect(&self) -> Result<ScriptedConn, StoreError> {
        self.script.connect_calls.fetch_add(1, Ordering::SeqCst);
        self.script.connect_times.lock().unwrap().push(Instant::now());
        next_outcome(&self.script.connects)?;
        Ok(ScriptedConn {
            script: self.script.clone(),
            store: self.store.clone(),
        })
    }
}

#[async_trait]
impl Store for ScriptedConn {
    async fn upsert(&mut self, snapshot: &system_monitor::HostSnapshot) -> Result<(), StoreError> {
        self.script.upsert_calls.fetch_add(1, Ordering::SeqCst);
        self.script.upsert_times.lock().unwrap().push(Instant::now());
        next_outcome(&self.script.upserts)?;
        self.store.upsert(snapshot).await
    }

    async fn close(self) {
        self.script.closes.fetch_add(1, Ordering::SeqCst);
    }
}

/// Probe whose first CPU sample is the priming one and whose later samples
/// count up from 10.
struct CountingProbe {
    samples: Arc<AtomicUsize>,
}

#[async_trait]
impl HostProbe for CountingProbe {
    async fn cpu_percent(&mut self, window: Duration) -> f64 {
        tokio::time::sleep(window).await;
        let n = self.samples.fetch_add(1, Ordering::SeqCst);
        if n == 0 {
            PRIMING_SAMPLE
        } else {
            10.0 + n as f64
        }
    }

    fn physical_core_count(&self) -> u32 {
        2
    }

    fn memory(&mut self) -> (u64, f64) {
        (4 * 1024 * 1024 * 1024, 50.0)
    }

    fn partitions(&self) -> Vec<PartitionReading> {
        Vec::new()
    }
}

struct Harness {
    script: Script,
    store: MemoryStore,
    samples: Arc<AtomicUsize>,
}

impl Harness {
    fn new(script: Script) -> Self {
        Self {
            script,
            store: MemoryStore::new(),
            samples: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn registrar(&self) -> Registrar<ScriptedConnector, CountingProbe> {
        let connector = ScriptedConnector {
            script: self.script.clone(),
            store: self.store.clone(),
        };
        let probe = CountingProbe {
            samples: self.samples.clone(),
        };
        let identity = HostIdentity {
            ip: IP.into(),
            hostname: "worker-3".into(),
            access_port: 8000,
        };
        let builder = SnapshotBuilder::new(probe, identity, SAMPLE_WINDOW);
        Registrar::new(connector, builder, RegistrationPolicy::default())
    }
}

/// Resolves once `counter` reaches `n`.
async fn once_reached(counter: Arc<AtomicUsize>, n: usize) {
    while counter.load(Ordering::SeqCst) < n {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

fn transport() -> Result<(), StoreError> {
    Err(StoreError::Transport("connection reset by peer".into()))
}

fn refused() -> Result<(), StoreError> {
    Err(StoreError::Connect("connection refused".into()))
}

#[tokio::test(start_paused = true)]
async fn test_steady_state_upserts_one_row() {
    let harness = Harness::new(Script::default());
    let shutdown = once_reached(harness.script.upsert_calls.clone(), 3);

    let stats = harness.registrar().run(shutdown).await.unwrap();

    assert_eq!(stats.successful_cycles, 3);
    assert_eq!(stats.announcements, 1);
    assert_eq!(harness.script.connect_calls.load(Ordering::SeqCst), 1);
    assert_eq!(harness.script.closes.load(Ordering::SeqCst), 1);

    // Latest write wins on the single row for this IP.
    assert_eq!(harness.store.len(), 1);
    let row = harness.store.get(IP).unwrap();
    assert_eq!(row.cpu_percent, 13.0);
    assert_eq!(row.access_port, 8000);
    assert_eq!(row.cpu_count_physical, 2);
    assert_eq!(row.memory_total_gib, 4.0);
}

#[tokio::test(start_paused = true)]
async fn test_priming_sample_never_stored() {
    let harness = Harness::new(Script::default());
    let shutdown = once_reached(harness.script.upsert_calls.clone(), 1);

    harness.registrar().run(shutdown).await.unwrap();

    // One priming sample plus one per cycle.
    assert_eq!(harness.samples.load(Ordering::SeqCst), 2);
    let row = harness.store.get(IP).unwrap();
    assert_ne!(row.cpu_percent, PRIMING_SAMPLE);
    assert_eq!(row.cpu_percent, 11.0);
}

#[tokio::test(start_paused = true)]
async fn test_cycles_are_paced_by_interval() {
    let harness = Harness::new(Script::default());
    let shutdown = once_reached(harness.script.upsert_calls.clone(), 3);

    harness.registrar().run(shutdown).await.unwrap();

    let times = harness.script.upsert_times();
    for pair in times.windows(2) {
        // One second of interval plus the CPU sampling window.
        assert_eq!(pair[1] - pair[0], Duration::from_secs(1) + SAMPLE_WINDOW);
    }
}

#[tokio::test(start_paused = true)]
async fn test_startup_connect_failure_is_fatal() {
    let script = Script::default().connects(vec![refused()]);
    let harness = Harness::new(script);

    let result = harness
        .registrar()
        .run(std::future::pending::<()>())
        .await;

    match result {
        Err(RegistrationError::Startup(StoreError::Connect(msg))) => {
            assert!(msg.contains("refused"));
        }
        other => panic!("expected startup failure, got {:?}", other.map(|s| s.successful_cycles)),
    }
    assert_eq!(harness.script.connect_calls.load(Ordering::SeqCst), 1);
    assert_eq!(harness.script.upsert_calls.load(Ordering::SeqCst), 0);
    assert_eq!(harness.samples.load(Ordering::SeqCst), 0);
    assert!(harness.store.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_transport_failure_reconnects_and_resumes() {
    let script = Script::default()
        .connects(vec![Ok(()), refused(), Ok(())])
        .upserts(vec![Ok(()), transport()]);
    let harness = Harness::new(script);
    let shutdown = once_reached(harness.script.upsert_calls.clone(), 4);

    let stats = harness.registrar().run(shutdown).await.unwrap();

    assert_eq!(stats.successful_cycles, 3);
    assert_eq!(stats.transport_failures, 1);
    assert_eq!(stats.reconnect_attempts, 2);
    assert_eq!(stats.reconnects, 1);
    // One notice per connection that registered successfully.
    assert_eq!(stats.announcements, 2);

    // The first reconnect is immediate, the second waits out the backoff.
    let connects = harness.script.connect_times();
    assert_eq!(connects.len(), 3);
    let upserts = harness.script.upsert_times();
    assert_eq!(connects[1], upserts[1]);
    assert_eq!(connects[2] - connects[1], Duration::from_secs(5));

    // Only the live connection is closed on shutdown.
    assert_eq!(harness.script.closes.load(Ordering::SeqCst), 1);
    assert_eq!(harness.store.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_reconnect_retries_with_fixed_backoff() {
    let script = Script::default()
        .connects(vec![Ok(()), refused(), refused(), refused(), refused(), Ok(())])
        .upserts(vec![transport()]);
    let harness = Harness::new(script);
    let shutdown = once_reached(harness.script.upsert_calls.clone(), 2);

    let stats = harness.registrar().run(shutdown).await.unwrap();

    assert_eq!(stats.reconnect_attempts, 5);
    assert_eq!(stats.reconnects, 1);
    assert_eq!(stats.successful_cycles, 1);

    let connects = harness.script.connect_times();
    assert_eq!(connects.len(), 6);
    for pair in connects[1..].windows(2) {
        assert_eq!(pair[1] - pair[0], Duration::from_secs(5));
    }
}

#[tokio::test(start_paused = true)]
async fn test_unexpected_error_keeps_connection() {
    let script = Script::default().upserts(vec![
        Ok(()),
        Err(StoreError::Unexpected("value out of range".into())),
    ]);
    let harness = Harness::new(script);
    let shutdown = once_reached(harness.script.upsert_calls.clone(), 3);

    let stats = harness.registrar().run(shutdown).await.unwrap();

    assert_eq!(stats.unexpected_failures, 1);
    assert_eq!(stats.transport_failures, 0);
    assert_eq!(stats.successful_cycles, 2);
    assert_eq!(stats.announcements, 1);
    assert_eq!(harness.script.connect_calls.load(Ordering::SeqCst), 1);

    let upserts = harness.script.upsert_times();
    assert_eq!(upserts[2] - upserts[1], Duration::from_secs(1) + SAMPLE_WINDOW);
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_during_backoff_is_clean() {
    let script = Script::default()
        .connects(vec![Ok(()), refused(), refused(), refused()])
        .upserts(vec![transport()]);
    let harness = Harness::new(script);
    let shutdown = once_reached(harness.script.connect_calls.clone(), 3);

    let stats = harness.registrar().run(shutdown).await.unwrap();

    assert_eq!(stats.successful_cycles, 0);
    assert_eq!(stats.transport_failures, 1);
    assert_eq!(stats.reconnects, 0);
    // The failed connection was already dropped; nothing left to close.
    assert_eq!(harness.script.closes.load(Ordering::SeqCst), 0);
    assert!(harness.store.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_before_first_cycle() {
    let harness = Harness::new(Script::default());

    let stats = harness.registrar().run(async {}).await.unwrap();

    assert_eq!(stats.successful_cycles, 0);
    assert_eq!(harness.script.connect_calls.load(Ordering::SeqCst), 0);
}
