//! Client-side Stores
//!
//! Each store caches the last-known server state for one resource and
//! mutates it only after the server accepted a change. Views subscribe to
//! change notifications and re-read snapshots.
//!
//! - [`session`]: authenticated user and bearer token
//! - [`groups`]: group list and the selected group
//! - [`chat`]: per-group message history, members and typing indicators
//! - [`notifications`]: notification list and counters
//! - [`persist`]: load/save boundary to a key-value backend

pub mod chat;
pub mod groups;
pub mod notifications;
pub mod persist;
pub mod session;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

pub use chat::{
    ChatState, ChatStore, PageCursor, TypingAnnouncer, MESSAGE_PAGE_SIZE, TYPING_QUIET_PERIOD,
    TYPING_REFRESH_INTERVAL,
};
pub use groups::{GroupState, GroupStore};
pub use notifications::{NotificationState, NotificationStore, NOTIFICATION_POLL_INTERVAL};
pub use persist::{KeyValueStorage, MemoryStorage};
pub use session::{Session, SessionState, SessionStore};

/// Change listener
pub type Listener = Arc<dyn Fn() + Send + Sync>;

/// Handle returned by [`Store::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Observable state cell shared by all stores
pub struct Store<S> {
    state: RwLock<S>,
    listeners: RwLock<Vec<(ListenerId, Listener)>>,
    next_id: AtomicU64,
}

impl<S: Clone> Store<S> {
    pub fn new(initial: S) -> Self {
        Self {
            state: RwLock::new(initial),
            listeners: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Clone of the current state
    pub fn snapshot(&self) -> S {
        self.read(S::clone)
    }

    pub fn read<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        let guard = self.state.read().unwrap_or_else(|e| e.into_inner());
        f(&guard)
    }

    /// Mutate the state, then notify listeners (outside the lock)
    pub fn update<R>(&self, f: impl FnOnce(&mut S) -> R) -> R {
        let result = {
            let mut guard = self.state.write().unwrap_or_else(|e| e.into_inner());
            f(&mut guard)
        };
        self.notify();
        result
    }

    pub fn replace(&self, state: S) {
        self.update(|current| *current = state);
    }

    pub fn subscribe(&self, listener: Listener) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push((id, listener));
        id
    }

    pub fn unsubscribe(&self, id: ListenerId) {
        self.listeners
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .retain(|(existing, _)| *existing != id);
    }

    fn notify(&self) {
        // Snapshot so listeners may (un)subscribe while being called
        let listeners: Vec<Listener> = self
            .listeners
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        for listener in listeners {
            listener();
        }
    }
}

impl<S: Clone + Default> Default for Store<S> {
    fn default() -> Self {
        Self::new(S::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_update_notifies() {
        let store = Store::new(0u32);
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        store.subscribe(Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        store.update(|v| *v += 2);
        store.replace(10);

        assert_eq!(store.snapshot(), 10);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_unsubscribe() {
        let store = Store::new(String::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let id = store.subscribe(Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        store.unsubscribe(id);
        store.update(|s| s.push('x'));

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(store.read(|s| s.len()), 1);
    }

    #[test]
    fn test_listener_can_read_during_notify() {
        let store = Arc::new(Store::new(vec![1, 2]));
        let seen = Arc::new(AtomicUsize::new(0));
        let (inner, seen_inner) = (Arc::clone(&store), Arc::clone(&seen));
        store.subscribe(Arc::new(move || {
            seen_inner.store(inner.read(|v| v.len()), Ordering::SeqCst);
        }));

        store.update(|v| v.push(3));
        assert_eq!(seen.load(Ordering::SeqCst), 3);
    }
}
