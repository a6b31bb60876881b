//! Tests for the autosave loop, run on a paused clock against an
//! in-memory transport.

use super::*;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex as StdMutex;
use stimmap_core::StateItem;
use tokio::sync::Semaphore;

struct MockTransport {
    server: StdMutex<VersionedState>,
    fail_saves: AtomicBool,
    deny_saves: AtomicBool,
    fail_fetches: AtomicBool,
    save_attempts: AtomicUsize,
    fetch_attempts: AtomicUsize,
    /// Saves wait for a permit; tests start with 0 permits to hold a save
    /// in flight
    gate: Semaphore,
}

impl MockTransport {
    fn new() -> Arc<Self> {
        Self::gated(Semaphore::MAX_PERMITS)
    }

    fn gated(permits: usize) -> Arc<Self> {
        let root = StateItem::root("root", "Problem");
        Arc::new(Self {
            server: StdMutex::new(VersionedState::new(
                MapState::new("root", vec![root]),
                0,
            )),
            fail_saves: AtomicBool::new(false),
            deny_saves: AtomicBool::new(false),
            fail_fetches: AtomicBool::new(false),
            save_attempts: AtomicUsize::new(0),
            fetch_attempts: AtomicUsize::new(0),
            gate: Semaphore::new(permits),
        })
    }

    fn server_state(&self) -> VersionedState {
        self.server.lock().unwrap().clone()
    }

    fn set_server_state(&self, state: VersionedState) {
        *self.server.lock().unwrap() = state;
    }

    fn saves(&self) -> usize {
        self.save_attempts.load(Ordering::SeqCst)
    }

    fn fetches(&self) -> usize {
        self.fetch_attempts.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl StateTransport for MockTransport {
    async fn fetch_state(&self) -> Result<VersionedState, TransportError> {
        self.fetch_attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail_fetches.load(Ordering::SeqCst) {
            return Err(TransportError::Network("connection refused".to_string()));
        }
        Ok(self.server_state())
    }

    async fn save_state(&self, candidate: &VersionedState) -> Result<SaveOutcome, TransportError> {
        let _permit = self.gate.acquire().await.unwrap();
        self.save_attempts.fetch_add(1, Ordering::SeqCst);

        if self.deny_saves.load(Ordering::SeqCst) {
            return Err(TransportError::Denied);
        }
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(TransportError::Network("connection refused".to_string()));
        }

        let mut server = self.server.lock().unwrap();
        if candidate.version == server.version {
            *server = VersionedState::new(candidate.state.clone(), server.version + 1);
            Ok(SaveOutcome::Accepted(server.clone()))
        } else {
            Ok(SaveOutcome::Conflict(server.clone()))
        }
    }
}

fn add_idea(state: &mut MapState, content: &str) {
    let key = format!("k{}", state.items.len());
    state.items[0].sub_item_keys.push(key.clone());
    state
        .items
        .push(StateItem::child(key, "root", content.to_string()));
}

/// Let one autosave tick fire and run to completion
async fn tick() {
    tokio::time::advance(AUTOSAVE_PERIOD).await;
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}

fn drain(rx: &mut mpsc::UnboundedReceiver<SyncEvent>) -> Vec<SyncEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

#[tokio::test(start_paused = true)]
async fn start_loads_the_current_state() {
    let transport = MockTransport::new();
    let (session, mut events) = SyncSession::start(transport.clone()).await.unwrap();

    assert_eq!(session.version().await, 0);
    assert!(!session.is_dirty().await);
    assert_eq!(drain(&mut events), vec![SyncEvent::Loaded { version: 0 }]);

    session.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn clean_session_never_saves() {
    let transport = MockTransport::new();
    let (session, _events) = SyncSession::start(transport.clone()).await.unwrap();

    tick().await;
    tick().await;
    tick().await;

    assert_eq!(transport.saves(), 0);
    session.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn dirty_state_is_flushed_on_the_tick() {
    let transport = MockTransport::new();
    let (session, mut events) = SyncSession::start(transport.clone()).await.unwrap();
    drain(&mut events);

    session.update(|s| add_idea(s, "an idea")).await;
    assert!(session.is_dirty().await);
    assert_eq!(transport.saves(), 0);

    tick().await;

    assert_eq!(transport.saves(), 1);
    assert_eq!(session.version().await, 1);
    assert!(!session.is_dirty().await);
    assert_eq!(drain(&mut events), vec![SyncEvent::Saved { version: 1 }]);

    let server = transport.server_state();
    assert_eq!(server.version, 1);
    assert!(server.state.items.iter().any(|i| i.content == "an idea"));

    // Nothing changed since; the next tick is a no-op
    tick().await;
    assert_eq!(transport.saves(), 1);

    session.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn conflict_discards_local_changes_and_adopts_server() {
    let transport = MockTransport::new();
    let (session, mut events) = SyncSession::start(transport.clone()).await.unwrap();
    drain(&mut events);

    // Another writer got there first
    let mut winner = transport.server_state();
    add_idea(&mut winner.state, "their idea");
    transport.set_server_state(VersionedState::new(winner.state.clone(), 1));

    session.update(|s| add_idea(s, "my idea")).await;
    tick().await;

    assert_eq!(drain(&mut events), vec![SyncEvent::Reverted { version: 1 }]);
    assert_eq!(session.version().await, 1);
    assert!(!session.is_dirty().await);

    let current = session.current().await;
    assert!(current.items.iter().any(|i| i.content == "their idea"));
    assert!(!current.items.iter().any(|i| i.content == "my idea"));

    // The server still holds the other writer's version
    assert_eq!(transport.server_state().version, 1);

    session.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn save_failure_resynchronizes_from_the_server() {
    let transport = MockTransport::new();
    let (session, mut events) = SyncSession::start(transport.clone()).await.unwrap();
    drain(&mut events);

    transport.fail_saves.store(true, Ordering::SeqCst);
    session.update(|s| add_idea(s, "lost idea")).await;
    tick().await;

    let events_seen = drain(&mut events);
    assert!(matches!(events_seen[0], SyncEvent::SaveFailed { .. }));
    assert_eq!(events_seen[1], SyncEvent::Reverted { version: 0 });

    // Local change was discarded for the refetched state
    assert!(!session.is_dirty().await);
    assert!(!session
        .current()
        .await
        .items
        .iter()
        .any(|i| i.content == "lost idea"));

    // Recovery: the next edit saves normally
    transport.fail_saves.store(false, Ordering::SeqCst);
    session.update(|s| add_idea(s, "new idea")).await;
    tick().await;
    assert_eq!(drain(&mut events), vec![SyncEvent::Saved { version: 1 }]);

    session.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn unreachable_server_keeps_local_state_and_retries() {
    let transport = MockTransport::new();
    let (session, mut events) = SyncSession::start(transport.clone()).await.unwrap();
    drain(&mut events);

    transport.fail_saves.store(true, Ordering::SeqCst);
    transport.fail_fetches.store(true, Ordering::SeqCst);
    session.update(|s| add_idea(s, "kept idea")).await;
    tick().await;

    // Only the failure is reported; the working copy survives
    let events_seen = drain(&mut events);
    assert_eq!(events_seen.len(), 1);
    assert!(matches!(events_seen[0], SyncEvent::SaveFailed { .. }));
    assert!(session.is_dirty().await);

    // Server comes back; the retry flushes the kept edit
    transport.fail_saves.store(false, Ordering::SeqCst);
    transport.fail_fetches.store(false, Ordering::SeqCst);
    tick().await;

    assert_eq!(drain(&mut events), vec![SyncEvent::Saved { version: 1 }]);
    assert!(transport
        .server_state()
        .state
        .items
        .iter()
        .any(|i| i.content == "kept idea"));

    session.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn edits_during_a_save_stay_dirty() {
    let transport = MockTransport::gated(0);
    let (session, mut events) = SyncSession::start(transport.clone()).await.unwrap();
    drain(&mut events);

    session.update(|s| add_idea(s, "first")).await;

    // Kick off a save that blocks inside the transport
    tokio::time::advance(AUTOSAVE_PERIOD).await;
    tokio::task::yield_now().await;

    // Edit while the request is in flight, then let it complete
    session.update(|s| add_idea(s, "second")).await;
    transport.gate.add_permits(1);
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }

    assert_eq!(drain(&mut events), vec![SyncEvent::Saved { version: 1 }]);
    assert_eq!(session.version().await, 1);

    // "first" is saved, "second" is not yet
    assert!(session.is_dirty().await);
    let server = transport.server_state();
    assert!(server.state.items.iter().any(|i| i.content == "first"));
    assert!(!server.state.items.iter().any(|i| i.content == "second"));

    // The next cycle flushes the in-flight edit
    transport.gate.add_permits(1);
    tick().await;
    assert_eq!(drain(&mut events), vec![SyncEvent::Saved { version: 2 }]);
    assert!(!session.is_dirty().await);

    session.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn denied_save_suspends_autosave() {
    let transport = MockTransport::new();
    let (session, mut events) = SyncSession::start(transport.clone()).await.unwrap();
    drain(&mut events);

    transport.deny_saves.store(true, Ordering::SeqCst);
    session.update(|s| add_idea(s, "revoked idea")).await;
    tick().await;

    // Access loss is reported, nothing is refetched, the edit survives
    assert_eq!(drain(&mut events), vec![SyncEvent::AccessLost]);
    assert!(session.is_dirty().await);
    assert_eq!(transport.saves(), 1);
    assert_eq!(transport.fetches(), 1); // only the initial load

    // A denied save is never retried, not even after the server would
    // allow it again
    transport.deny_saves.store(false, Ordering::SeqCst);
    tick().await;
    tick().await;

    assert_eq!(transport.saves(), 1);
    assert!(drain(&mut events).is_empty());
    assert_eq!(transport.server_state().version, 0);

    session.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn save_now_flushes_without_waiting_for_the_timer() {
    let transport = MockTransport::new();
    let (session, mut events) = SyncSession::start(transport.clone()).await.unwrap();
    drain(&mut events);

    session.update(|s| add_idea(s, "urgent")).await;
    session.save_now().await;

    assert_eq!(transport.saves(), 1);
    assert_eq!(session.version().await, 1);
    assert_eq!(drain(&mut events), vec![SyncEvent::Saved { version: 1 }]);

    session.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn shutdown_cancels_the_autosave_loop() {
    let transport = MockTransport::new();
    let (session, _events) = SyncSession::start(transport.clone()).await.unwrap();

    session.update(|s| add_idea(s, "never flushed")).await;
    session.shutdown().await;

    tokio::time::advance(AUTOSAVE_PERIOD * 3).await;
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }

    assert_eq!(transport.saves(), 0);
}
