//! Mirrors provider session state into a reactive snapshot.
//!
//! The [`SessionSynchronizer`] is the only writer of the snapshot; the rest of
//! the client reads it through cloneable [`SessionHandle`]s.

use std::sync::{Arc, Mutex};

use omni_auth_types::{AuthChangeEvent, Session, User};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::AuthSdkError;
use crate::gateway::AuthGateway;
use crate::listeners::Subscription;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Initializing,
    Authenticated,
    Anonymous,
}

/// Authentication state as seen by the UI.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthSnapshot {
    pub user: Option<User>,
    pub session: Option<Session>,
    pub loading: bool,
}

impl AuthSnapshot {
    pub fn initializing() -> Self {
        Self {
            user: None,
            session: None,
            loading: true,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    pub fn state(&self) -> AuthState {
        if self.loading {
            AuthState::Initializing
        } else if self.is_authenticated() {
            AuthState::Authenticated
        } else {
            AuthState::Anonymous
        }
    }

    fn apply_session(&mut self, session: Option<Session>) {
        self.user = session.as_ref().map(|s| s.user.clone());
        self.session = session;
    }
}

impl Default for AuthSnapshot {
    fn default() -> Self {
        Self::initializing()
    }
}

/// Sender half of the snapshot. Updates stop once torn down.
struct SnapshotWriter {
    tx: watch::Sender<AuthSnapshot>,
    live: Mutex<bool>,
}

impl SnapshotWriter {
    fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut AuthSnapshot),
    {
        // Held while sending so teardown cannot interleave with an update.
        let live = self.live.lock().unwrap_or_else(|p| p.into_inner());
        if !*live {
            debug!("Dropping session update after teardown");
            return;
        }
        self.tx.send_modify(f);
    }

    fn close(&self) {
        *self.live.lock().unwrap_or_else(|p| p.into_inner()) = false;
    }
}

/// Read-only view of the session snapshot.
#[derive(Clone)]
pub struct SessionHandle {
    rx: watch::Receiver<AuthSnapshot>,
}

impl SessionHandle {
    pub fn snapshot(&self) -> AuthSnapshot {
        self.rx.borrow().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.rx.borrow().is_authenticated()
    }

    /// Wait for the next change. Returns `false` once the synchronizer is gone.
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }

    /// Wait until the initial session fetch has resolved.
    pub async fn loaded(&mut self) -> AuthSnapshot {
        if let Ok(snapshot) = self.rx.wait_for(|s| !s.loading).await {
            return snapshot.clone();
        }
        self.rx.borrow().clone()
    }
}

/// Session state synchronizer.
///
/// On start it fetches the current session once and subscribes to provider
/// pushes. Both sources write the snapshot in delivery order; the last write
/// wins. Dropping or calling [`SessionSynchronizer::shutdown`] releases the
/// provider subscription exactly once and discards any update still in
/// flight.
pub struct SessionSynchronizer {
    writer: Arc<SnapshotWriter>,
    subscription: Option<Subscription>,
}

impl SessionSynchronizer {
    /// Start synchronizing. Must be called from within a tokio runtime.
    pub fn start(gateway: &AuthGateway) -> Result<Self, AuthSdkError> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| AuthSdkError::Runtime(e.to_string()))?;

        let (tx, _rx) = watch::channel(AuthSnapshot::initializing());
        let writer = Arc::new(SnapshotWriter {
            tx,
            live: Mutex::new(true),
        });

        let push_writer = writer.clone();
        let subscription = gateway.subscribe_to_auth_changes(
            move |event: AuthChangeEvent, session: Option<Session>| {
                debug!(%event, has_session = session.is_some(), "Session pushed");
                push_writer.update(|snapshot| snapshot.apply_session(session));
            },
        );

        let fetch_writer = writer.clone();
        let gateway = gateway.clone();
        runtime.spawn(async move {
            let result = gateway.get_session().await;
            if let Some(err) = &result.error {
                warn!(error = %err, "Initial session fetch failed, continuing anonymous");
            }
            let session = result.session;
            info!(authenticated = session.is_some(), "Initial session resolved");
            fetch_writer.update(|snapshot| {
                snapshot.apply_session(session);
                snapshot.loading = false;
            });
        });

        Ok(Self {
            writer,
            subscription: Some(subscription),
        })
    }

    pub fn handle(&self) -> SessionHandle {
        SessionHandle {
            rx: self.writer.tx.subscribe(),
        }
    }

    pub fn snapshot(&self) -> AuthSnapshot {
        self.writer.tx.borrow().clone()
    }

    pub fn shutdown(mut self) {
        self.teardown();
    }

    fn teardown(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            self.writer.close();
            subscription.unsubscribe();
            debug!("Session synchronizer torn down");
        }
    }
}

impl Drop for SessionSynchronizer {
    fn drop(&mut self) {
        self.teardown();
    }
}
