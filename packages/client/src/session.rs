//! Editing session with background autosave
//!
//! A [`SyncSession`] holds the local working copy of a project's state and
//! flushes it through a [`StateTransport`] on a fixed cadence.
//!
//! # Autosave protocol
//!
//! Every tick (10 seconds by default):
//!
//! 1. If the working copy matches the last saved payload, do nothing.
//! 2. Otherwise snapshot the working copy together with the session's
//!    version and submit it. Edits made while the request is in flight are
//!    untouched and stay dirty for the next tick.
//! 3. Accepted: the snapshot becomes the last saved payload and the session
//!    adopts the confirmed version.
//! 4. Conflict: local changes are discarded, working copy and version are
//!    reset to the authoritative state the server returned.
//! 5. Transport failure: the session refetches the authoritative state and
//!    recovers the same way as a conflict; if the refetch also fails it
//!    keeps its local state and retries on a later tick.
//! 6. Denied: access loss is terminal for the session. It reports
//!    [`SyncEvent::AccessLost`] and stops submitting; a denied save is
//!    never retried automatically.
//!
//! Observers follow the session through the [`SyncEvent`] channel.

use crate::transport::{SaveOutcome, StateTransport, TransportError};
use std::sync::Arc;
use std::time::Duration;
use stimmap_core::{MapState, VersionedState};
use tokio::sync::{mpsc, Mutex};
use tokio::time::{interval_at, Instant};
use tracing::{debug, warn};

/// Default autosave cadence
pub const AUTOSAVE_PERIOD: Duration = Duration::from_secs(10);

/// Notifications emitted by the session
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    /// Initial state fetched at session start
    Loaded { version: i64 },

    /// A save was accepted; the session now holds this version
    Saved { version: i64 },

    /// Local changes were discarded for the authoritative state
    Reverted { version: i64 },

    /// A save attempt failed to complete
    SaveFailed { reason: String },

    /// The server denied a save; autosave is suspended until the session
    /// is restarted with valid access
    AccessLost,
}

struct SessionState {
    /// The working copy being edited
    current: MapState,

    /// Payload of the last write the server confirmed (or the initial fetch)
    last_saved: MapState,

    /// Version the working copy is based on
    version: i64,

    /// Set once the server denies a save; no further saves are attempted
    suspended: bool,
}

impl SessionState {
    /// Replace everything with the authoritative server state
    fn adopt(&mut self, server: VersionedState) {
        self.current = server.state.clone();
        self.last_saved = server.state;
        self.version = server.version;
    }
}

/// A live editing session for one project
///
/// Cloning is not supported; the session owns its background task. Dropping
/// the session also stops the task (the shutdown channel closes).
pub struct SyncSession {
    inner: Arc<Mutex<SessionState>>,
    transport: Arc<dyn StateTransport>,
    events: mpsc::UnboundedSender<SyncEvent>,
    shutdown_tx: mpsc::Sender<()>,
    task: tokio::task::JoinHandle<()>,
}

impl SyncSession {
    /// Start a session with the default 10-second autosave cadence
    pub async fn start(
        transport: Arc<dyn StateTransport>,
    ) -> Result<(Self, mpsc::UnboundedReceiver<SyncEvent>), TransportError> {
        Self::start_with_period(transport, AUTOSAVE_PERIOD).await
    }

    /// Start a session with a custom autosave cadence
    ///
    /// Fetches the initial state, emits `Loaded`, and spawns the autosave
    /// loop. The first tick fires one full period after start.
    pub async fn start_with_period(
        transport: Arc<dyn StateTransport>,
        period: Duration,
    ) -> Result<(Self, mpsc::UnboundedReceiver<SyncEvent>), TransportError> {
        let initial = transport.fetch_state().await?;
        debug!(version = initial.version, "session loaded");

        let inner = Arc::new(Mutex::new(SessionState {
            current: initial.state.clone(),
            last_saved: initial.state,
            version: initial.version,
            suspended: false,
        }));

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let _ = events_tx.send(SyncEvent::Loaded {
            version: initial.version,
        });

        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        let loop_inner = inner.clone();
        let loop_transport = transport.clone();
        let loop_events = events_tx.clone();
        let mut ticker = interval_at(Instant::now() + period, period);
        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased; // check shutdown first

                    _ = shutdown_rx.recv() => {
                        debug!("autosave loop shutting down");
                        break;
                    }

                    _ = ticker.tick() => {
                        sync_once(&loop_inner, loop_transport.as_ref(), &loop_events).await;
                    }
                }
            }
        });

        Ok((
            Self {
                inner,
                transport,
                events: events_tx,
                shutdown_tx,
                task,
            },
            events_rx,
        ))
    }

    /// Mutate the working copy
    ///
    /// The change is local until an autosave tick (or [`save_now`]) flushes
    /// it.
    ///
    /// [`save_now`]: Self::save_now
    pub async fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut MapState),
    {
        let mut guard = self.inner.lock().await;
        f(&mut guard.current);
    }

    /// Snapshot of the working copy
    pub async fn current(&self) -> MapState {
        self.inner.lock().await.current.clone()
    }

    /// Version the working copy is based on
    pub async fn version(&self) -> i64 {
        self.inner.lock().await.version
    }

    /// Does the working copy differ from the last saved payload?
    pub async fn is_dirty(&self) -> bool {
        let guard = self.inner.lock().await;
        guard.current != guard.last_saved
    }

    /// Run one save cycle immediately, outside the timer
    pub async fn save_now(&self) {
        sync_once(&self.inner, self.transport.as_ref(), &self.events).await;
    }

    /// Stop the autosave loop
    ///
    /// Pending local changes are NOT flushed; call [`save_now`] first if
    /// they matter.
    ///
    /// [`save_now`]: Self::save_now
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        let _ = self.task.await;
    }
}

/// One autosave cycle: snapshot, submit, reconcile
async fn sync_once(
    inner: &Mutex<SessionState>,
    transport: &dyn StateTransport,
    events: &mpsc::UnboundedSender<SyncEvent>,
) {
    // Snapshot under the lock, then release it for the request so edits
    // can continue while the save is in flight.
    let snapshot = {
        let guard = inner.lock().await;
        if guard.suspended || guard.current == guard.last_saved {
            return;
        }
        VersionedState::new(guard.current.clone(), guard.version)
    };

    match transport.save_state(&snapshot).await {
        Ok(SaveOutcome::Accepted(stored)) => {
            let mut guard = inner.lock().await;
            // Only the snapshot is confirmed; in-flight edits stay dirty
            guard.last_saved = snapshot.state;
            guard.version = stored.version;
            debug!(version = stored.version, "autosave accepted");
            let _ = events.send(SyncEvent::Saved {
                version: stored.version,
            });
        }
        Ok(SaveOutcome::Conflict(server)) => {
            warn!(
                submitted = snapshot.version,
                authoritative = server.version,
                "autosave conflict, discarding local changes"
            );
            let version = server.version;
            inner.lock().await.adopt(server);
            let _ = events.send(SyncEvent::Reverted { version });
        }
        Err(TransportError::Denied) => {
            warn!("autosave denied by server, suspending saves");
            inner.lock().await.suspended = true;
            let _ = events.send(SyncEvent::AccessLost);
        }
        Err(e) => {
            warn!("autosave failed: {}", e);
            let _ = events.send(SyncEvent::SaveFailed {
                reason: e.to_string(),
            });

            // The write may or may not have landed; resynchronize from the
            // server when it is reachable again.
            match transport.fetch_state().await {
                Ok(server) => {
                    let version = server.version;
                    inner.lock().await.adopt(server);
                    let _ = events.send(SyncEvent::Reverted { version });
                }
                Err(e) => {
                    warn!("resync fetch failed, keeping local state: {}", e);
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;
