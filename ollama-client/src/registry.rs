//! Tracks the in-flight streams of one client so they can be aborted together.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio_util::sync::CancellationToken;

/// Identifies one registered stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CallId(u64);

impl std::fmt::Display for CallId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "call-{}", self.0)
    }
}

/// An in-flight stream as the registry sees it.
#[derive(Debug)]
struct ActiveCall {
    endpoint: &'static str,
    token: CancellationToken,
}

#[derive(Debug, Default)]
struct Calls {
    next_id: u64,
    live: BTreeMap<CallId, ActiveCall>,
}

/// The set of live streams owned by one client.
///
/// Cloning yields another handle to the same set. Entries are added when a
/// stream is created and removed when it terminates or is aborted, whichever
/// side gets there first; removal is idempotent.
#[derive(Debug, Clone, Default)]
pub struct ActiveCalls {
    calls: Arc<Mutex<Calls>>,
}

impl ActiveCalls {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Calls> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Track a stream by the token its transport observes.
    pub fn register(&self, endpoint: &'static str, token: CancellationToken) -> CallId {
        let mut calls = self.lock();
        let id = CallId(calls.next_id);
        calls.next_id += 1;
        calls.live.insert(id, ActiveCall { endpoint, token });
        tracing::debug!(call = %id, endpoint, "stream registered");
        id
    }

    /// Stop tracking a stream. Returns `false` if it was already gone.
    pub fn unregister(&self, id: CallId) -> bool {
        self.lock().live.remove(&id).is_some()
    }

    /// Whether a stream is still tracked.
    pub fn contains(&self, id: CallId) -> bool {
        self.lock().live.contains_key(&id)
    }

    /// Number of tracked streams.
    pub fn len(&self) -> usize {
        self.lock().live.len()
    }

    /// Whether no streams are tracked.
    pub fn is_empty(&self) -> bool {
        self.lock().live.is_empty()
    }

    /// Tie a registered call to a guard that unregisters it on drop.
    pub(crate) fn guard(&self, id: CallId) -> Registration {
        Registration {
            calls: self.clone(),
            id,
            armed: true,
        }
    }

    /// Cancel every tracked stream and clear the set. Returns how many were
    /// cancelled.
    ///
    /// The set is emptied before any token fires, so cleanups that call
    /// [`unregister`](Self::unregister) during the sweep find nothing to do.
    pub fn abort_all(&self) -> usize {
        let drained = std::mem::take(&mut self.lock().live);
        let count = drained.len();
        for (id, call) in drained {
            tracing::debug!(call = %id, endpoint = call.endpoint, "aborting stream");
            call.token.cancel();
        }
        count
    }
}

/// Keeps a call registered only while its request is alive.
///
/// Dropping the guard unregisters the call, which covers request futures that
/// are dropped before a stream exists. Once the stream is built the guard is
/// converted into the stream's cleanup with [`into_cleanup`](Self::into_cleanup).
#[derive(Debug)]
#[must_use = "dropping the guard unregisters the call"]
pub(crate) struct Registration {
    calls: ActiveCalls,
    id: CallId,
    armed: bool,
}

impl Registration {
    /// Hand removal over to a callback that runs when the stream finishes.
    pub(crate) fn into_cleanup(mut self) -> impl FnOnce() + Send + 'static {
        self.armed = false;
        let calls = self.calls.clone();
        let id = self.id;
        move || {
            if calls.unregister(id) {
                tracing::debug!(call = %id, "stream unregistered");
            }
        }
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        if self.armed && self.calls.unregister(self.id) {
            tracing::debug!(call = %self.id, "request dropped before a stream was returned");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_and_unregister() {
        let registry = ActiveCalls::new();
        let a = registry.register("chat", CancellationToken::new());
        let b = registry.register("chat", CancellationToken::new());
        assert_ne!(a, b);
        assert_eq!(registry.len(), 2);

        assert!(registry.unregister(a));
        assert!(!registry.contains(a));
        assert!(registry.contains(b));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn unregister_is_idempotent() {
        let registry = ActiveCalls::new();
        let id = registry.register("pull", CancellationToken::new());
        assert!(registry.unregister(id));
        assert!(!registry.unregister(id));
        assert!(registry.is_empty());
    }

    #[test]
    fn abort_all_cancels_and_clears() {
        let registry = ActiveCalls::new();
        let tokens: Vec<CancellationToken> = (0..3).map(|_| CancellationToken::new()).collect();
        for t in &tokens {
            registry.register("chat", t.clone());
        }

        assert_eq!(registry.abort_all(), 3);
        assert!(registry.is_empty());
        assert!(tokens.iter().all(CancellationToken::is_cancelled));
        assert_eq!(registry.abort_all(), 0);
    }

    #[test]
    fn unregister_after_sweep_is_noop() {
        let registry = ActiveCalls::new();
        let token = CancellationToken::new();
        let id = registry.register("chat", token.clone());
        let kept = registry.register("chat", CancellationToken::new());
        registry.unregister(kept);

        registry.abort_all();
        assert!(token.is_cancelled());
        assert!(!registry.unregister(id));
    }

    #[test]
    fn clones_share_state() {
        let registry = ActiveCalls::new();
        let other = registry.clone();
        let id = registry.register("generate", CancellationToken::new());
        assert!(other.contains(id));
        other.unregister(id);
        assert!(registry.is_empty());
    }

    #[test]
    fn dropped_guard_unregisters() {
        let registry = ActiveCalls::new();
        let id = registry.register("chat", CancellationToken::new());
        drop(registry.guard(id));
        assert!(!registry.contains(id));
        assert!(registry.is_empty());
    }

    #[test]
    fn converted_guard_unregisters_only_when_cleanup_runs() {
        let registry = ActiveCalls::new();
        let id = registry.register("chat", CancellationToken::new());
        let cleanup = registry.guard(id).into_cleanup();
        assert!(registry.contains(id));

        cleanup();
        assert!(registry.is_empty());
    }

    #[test]
    fn guard_after_sweep_is_noop() {
        let registry = ActiveCalls::new();
        let id = registry.register("chat", CancellationToken::new());
        let guard = registry.guard(id);
        let other = registry.register("pull", CancellationToken::new());

        registry.abort_all();
        let later = registry.register("chat", CancellationToken::new());
        drop(guard);

        assert!(!registry.contains(other));
        assert!(registry.contains(later));
    }

    #[test]
    fn ids_display_readably() {
        let registry = ActiveCalls::new();
        let id = registry.register("chat", CancellationToken::new());
        assert_eq!(id.to_string(), "call-0");
    }
}
