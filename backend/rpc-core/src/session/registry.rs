//! Token-keyed session table shared by every connection task.
//!
//! # Synchronization
//!
//! - The map sits behind an async `RwLock`: lookups from different sessions
//!   proceed in parallel, registration takes the write lock briefly.
//! - Each session sits behind its own `Mutex`. The dispatcher holds that lock
//!   from the counter check until the response is signed, so requests on one
//!   session are serialized while other sessions are unaffected.
//! - Each session also owns a `watch` channel publishing `recv_counter`
//!   after every increment. A request that arrives ahead of its predecessor
//!   waits on it (bounded) instead of failing the exact-match check.
//!
//! Sessions are never removed; the table grows for the life of the process.

use crate::error::session::SessionError;
use crate::session::Session;

use common::{ErrorLocation, SessionToken};

use std::collections::HashMap;
use std::panic::Location;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info};
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock, watch};

struct SessionSlot {
    session: Arc<Mutex<Session>>,
    progress: watch::Sender<i32>,
}

/// Shared handle to one registered session.
#[derive(Clone)]
pub struct SessionRef {
    slot: Arc<SessionSlot>,
}

impl SessionRef {
    fn new(session: Session) -> Self {
        let (progress, _) = watch::channel(session.recv_counter);
        Self {
            slot: Arc::new(SessionSlot {
                session: Arc::new(Mutex::new(session)),
                progress,
            }),
        }
    }

    /// Exclusive access to the session until the guard is dropped.
    pub async fn lock(&self) -> OwnedMutexGuard<Session> {
        Arc::clone(&self.slot.session).lock_owned().await
    }

    /// Last `recv_counter` value published for this session.
    pub fn last_received(&self) -> i32 {
        *self.slot.progress.borrow()
    }

    /// Publishes `recv_counter` to requests waiting for their turn.
    pub fn publish_received(&self, counter: i32) {
        self.slot.progress.send_replace(counter);
    }

    /// Waits until `sequence` is the next expected value (or already past it).
    ///
    /// Returns `false` if `window` elapsed first; the caller still performs the
    /// exact-match check, which then fails.
    pub async fn wait_for_turn(&self, sequence: i32, window: Duration) -> bool {
        let mut progress = self.slot.progress.subscribe();
        let turn = progress.wait_for(|last| last.saturating_add(1) >= sequence);
        matches!(tokio::time::timeout(window, turn).await, Ok(Ok(_)))
    }
}

#[derive(Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<RwLock<HashMap<SessionToken, SessionRef>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a new, unregistered session trusting `verify_key` as supplied.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Crypto`] if secure randomness is unavailable.
    pub fn create(&self, verify_key: Vec<u8>) -> Result<Session, SessionError> {
        let session = Session::generate(verify_key)?;
        debug!("Created session {:?}", session);
        Ok(session)
    }

    /// Stores `session` under its token.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::DuplicateToken`] if the token was already issued.
    pub async fn register(&self, session: Session) -> Result<SessionRef, SessionError> {
        let mut sessions = self.sessions.write().await;

        if sessions.contains_key(session.token().as_str()) {
            return Err(SessionError::DuplicateToken {
                message: String::from("Generated token collides with an issued token"),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let token = session.token().clone();
        let session_ref = SessionRef::new(session);
        sessions.insert(token, session_ref.clone());

        info!("Registered session ({} active)", sessions.len());
        Ok(session_ref)
    }

    pub async fn lookup(&self, token: &str) -> Option<SessionRef> {
        self.sessions.read().await.get(token).cloned()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}
