//! Auth state change listeners.
//!
//! Providers keep a [`ListenerRegistry`] and hand out a [`Subscription`] for
//! every registered callback. Once a subscription is released its callback
//! is never invoked again.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use omni_auth_types::{AuthChangeEvent, Session};
use tracing::debug;

/// Callback invoked with every session change.
pub type AuthCallback = Arc<dyn Fn(AuthChangeEvent, Option<Session>) + Send + Sync>;

struct Listener {
    id: u64,
    active: Arc<AtomicBool>,
    callback: AuthCallback,
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    listeners: Vec<Listener>,
}

fn lock(registry: &Mutex<Registry>) -> MutexGuard<'_, Registry> {
    registry.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Set of callbacks subscribed to a provider's session changes.
#[derive(Clone, Default)]
pub struct ListenerRegistry {
    inner: Arc<Mutex<Registry>>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, callback: AuthCallback) -> Subscription {
        let active = Arc::new(AtomicBool::new(true));
        let mut registry = lock(&self.inner);
        let id = registry.next_id;
        registry.next_id += 1;
        registry.listeners.push(Listener {
            id,
            active: active.clone(),
            callback,
        });
        debug!(listener_id = id, "Auth listener subscribed");

        Subscription {
            id,
            active,
            registry: Arc::downgrade(&self.inner),
            released: false,
        }
    }

    /// Deliver an event to every live listener, in registration order.
    ///
    /// Callbacks run outside the registry lock so they may subscribe or
    /// unsubscribe themselves.
    pub fn emit(&self, event: AuthChangeEvent, session: Option<&Session>) {
        let listeners: Vec<(Arc<AtomicBool>, AuthCallback)> = lock(&self.inner)
            .listeners
            .iter()
            .map(|l| (l.active.clone(), l.callback.clone()))
            .collect();

        debug!(%event, listeners = listeners.len(), "Emitting auth change");

        for (active, callback) in listeners {
            if active.load(Ordering::Acquire) {
                callback(event, session.cloned());
            }
        }
    }

    pub fn len(&self) -> usize {
        lock(&self.inner).listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Handle to a registered listener.
///
/// Released exactly once: either by [`Subscription::unsubscribe`] or when
/// the handle is dropped.
#[must_use = "dropping a Subscription unsubscribes the listener"]
pub struct Subscription {
    id: u64,
    active: Arc<AtomicBool>,
    registry: Weak<Mutex<Registry>>,
    released: bool,
}

impl Subscription {
    pub fn unsubscribe(mut self) {
        self.release();
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.active.store(false, Ordering::Release);

        if let Some(registry) = self.registry.upgrade() {
            lock(&registry).listeners.retain(|l| l.id != self.id);
            debug!(listener_id = self.id, "Auth listener unsubscribed");
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}
