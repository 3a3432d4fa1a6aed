use crate::dispatch::headers::RpcHeaders;
use crate::session::{Session, SessionRef};

use tokio::sync::OwnedMutexGuard;

/// Per-call state owned by the dispatcher.
///
/// When a session is attached, its lock is held until the context is dropped,
/// which serializes requests on the same session.
pub struct RequestContext {
    pub headers: RpcHeaders,
    session: Option<OwnedMutexGuard<Session>>,
}

impl RequestContext {
    pub fn new(headers: RpcHeaders) -> Self {
        Self {
            headers,
            session: None,
        }
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_deref()
    }

    pub fn session_mut(&mut self) -> Option<&mut Session> {
        self.session.as_deref_mut()
    }

    pub fn has_session(&self) -> bool {
        self.session.is_some()
    }

    /// Locks `session_ref` and binds it to this request.
    pub async fn attach_session(&mut self, session_ref: SessionRef) {
        let guard = session_ref.lock().await;
        self.attach_locked(guard);
    }

    pub(crate) fn attach_locked(&mut self, guard: OwnedMutexGuard<Session>) {
        self.session = Some(guard);
    }
}

impl std::fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestContext")
            .field("headers", &self.headers)
            .field("session", &self.session())
            .finish()
    }
}
