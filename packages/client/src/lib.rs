//! Stimmap Synchronization Client
//!
//! Keeps a local copy of a project's mind-map state and writes it back to
//! the server on a fixed autosave cadence (10 seconds by default).
//!
//! # Modules
//!
//! - [`transport`] - the wire abstraction ([`StateTransport`]) and its
//!   outcome/error types
//! - [`http`] - the reqwest-backed transport for the Stimmap REST API
//! - [`session`] - the editing session with the background autosave loop
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use stimmap_client::{HttpTransport, SyncSession};
//!
//! # async fn run() -> Result<(), stimmap_client::TransportError> {
//! let transport = HttpTransport::new("http://localhost:8080", "project-uid", "token");
//! let (session, _events) = SyncSession::start(Arc::new(transport)).await?;
//!
//! session
//!     .update(|state| {
//!         state.items[0].content = "Sharper problem statement".to_string();
//!     })
//!     .await;
//! // the change is flushed by the next autosave tick
//! # Ok(())
//! # }
//! ```

pub mod http;
pub mod session;
pub mod transport;

pub use http::HttpTransport;
pub use session::{SyncEvent, SyncSession};
pub use transport::{SaveOutcome, StateTransport, TransportError};
