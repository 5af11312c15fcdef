use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tramites_dialogue::DialogueState;

pub(crate) type SessionHandle = Arc<tokio::sync::Mutex<DialogueState>>;

struct SessionEntry {
    state: SessionHandle,
    last_used: Instant,
}

/// Conversation states keyed by session id.
///
/// The registry lock only covers lookup and insertion. A turn holds the session's own
/// async mutex, so turns of one session run one after another while other sessions
/// proceed.
pub(crate) struct SessionRegistry {
    sessions: Mutex<HashMap<String, SessionEntry>>,
    ttl: Duration,
    capacity: usize,
}

impl SessionRegistry {
    pub(crate) fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            ttl,
            capacity: capacity.max(1),
        }
    }

    /// State for `id`, created on first use
    pub(crate) fn checkout(&self, id: &str) -> SessionHandle {
        let now = Instant::now();
        let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);

        // sessions with a turn in flight are never dropped
        let ttl = self.ttl;
        sessions.retain(|_, entry| {
            now.duration_since(entry.last_used) < ttl || Arc::strong_count(&entry.state) > 1
        });

        if let Some(entry) = sessions.get_mut(id) {
            entry.last_used = now;
            return entry.state.clone();
        }

        if sessions.len() >= self.capacity {
            let oldest = sessions
                .iter()
                .filter(|(_, entry)| Arc::strong_count(&entry.state) == 1)
                .min_by_key(|(_, entry)| entry.last_used)
                .map(|(key, _)| key.clone());
            if let Some(key) = oldest {
                log::debug!("Evicting least recently used session {key}");
                sessions.remove(&key);
            }
        }

        let state = SessionHandle::default();
        sessions.insert(
            id.to_string(),
            SessionEntry {
                state: state.clone(),
                last_used: now,
            },
        );
        state
    }

    /// Forget a session; returns whether it existed
    pub(crate) fn remove(&self, id: &str) -> bool {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id)
            .is_some()
    }

    pub(crate) fn len(&self) -> usize {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
