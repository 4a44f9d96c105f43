use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;

/// At most one cancellable handle per `sessionId`. Registering a new handle
/// cancels and replaces any prior one. Generalized from the teacher's
/// `runtime/cancel.rs` `CancelMap` — the group-cascade machinery there has
/// no counterpart in this spec and is dropped; `CancellationToken` replaces
/// the teacher's hand-rolled `AtomicBool`-backed `CancelToken` since it
/// natively supports async `.cancelled()` waiting.
#[derive(Default)]
pub struct TurnRegistry {
    entries: RwLock<HashMap<String, (u64, CancellationToken)>>,
    next_id: AtomicU64,
}

impl TurnRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `token` for `session_id`, cancelling and replacing any
    /// prior entry. Returns a generation id to pass to `deregister`, so a
    /// stale deregister from an already-displaced turn can't clobber a
    /// newer registration.
    pub fn register(&self, session_id: &str, token: CancellationToken) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let mut entries = self.entries.write();
        if let Some((_, previous)) = entries.insert(session_id.to_string(), (id, token)) {
            previous.cancel();
        }
        id
    }

    /// Cancels the current in-flight turn for `session_id`, if any. Returns
    /// whether one was present.
    pub fn cancel(&self, session_id: &str) -> bool {
        match self.entries.read().get(session_id) {
            Some((_, token)) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Removes the entry for `session_id` only if it is still the one
    /// identified by `generation` — a newer registration already displaced
    /// it otherwise, and that entry must survive.
    pub fn deregister(&self, session_id: &str, generation: u64) {
        let mut entries = self.entries.write();
        if matches!(entries.get(session_id), Some((current, _)) if *current == generation) {
            entries.remove(session_id);
        }
    }

    pub fn is_running(&self, session_id: &str) -> bool {
        self.entries.read().contains_key(session_id)
    }
}
