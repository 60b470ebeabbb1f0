//! Session management for bot users

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Per-user menu state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub selected_dataset: Option<String>,
}

/// Where the user is in the menus; derived from [`Session`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuState {
    AwaitingDataset,
    AwaitingMetric,
}

impl fmt::Display for MenuState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MenuState::AwaitingDataset => f.write_str("awaiting dataset"),
            MenuState::AwaitingMetric => f.write_str("awaiting metric"),
        }
    }
}

impl Session {
    pub fn with_dataset(dataset: impl Into<String>) -> Self {
        Self {
            selected_dataset: Some(dataset.into()),
        }
    }

    pub fn state(&self) -> MenuState {
        if self.selected_dataset.is_some() {
            MenuState::AwaitingMetric
        } else {
            MenuState::AwaitingDataset
        }
    }

    pub fn clear(&mut self) {
        self.selected_dataset = None;
    }
}

type SharedSession = Arc<Mutex<Session>>;

/// Sessions keyed by user id
///
/// Each user's session sits behind its own async mutex, so one event per user
/// is in flight at a time while different users proceed independently.
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<String, SharedSession>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&self, user_id: &str) -> SharedSession {
        if let Some(session) = self
            .sessions
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(user_id)
        {
            return Arc::clone(session);
        }

        let mut sessions = self
            .sessions
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        Arc::clone(sessions.entry(user_id.to_string()).or_insert_with(|| {
            tracing::debug!(user_id, "creating session");
            Arc::new(Mutex::new(Session::default()))
        }))
    }

    /// Exclusive access to a user's session, created empty on first use
    pub async fn lock(&self, user_id: &str) -> OwnedMutexGuard<Session> {
        self.entry(user_id).lock_owned().await
    }

    /// Snapshot of a user's session, created empty on first use
    pub async fn get(&self, user_id: &str) -> Session {
        self.lock(user_id).await.clone()
    }

    /// Forget an idle user's session; returns whether it was removed
    ///
    /// A session that is locked, or that a task is waiting on, stays in the
    /// store so later events still queue behind the current holder.
    pub fn clear(&self, user_id: &str) -> bool {
        let mut sessions = self
            .sessions
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        // Clones only happen under the map lock, so the count cannot grow here
        match sessions.get(user_id) {
            Some(session) if Arc::strong_count(session) == 1 => {
                sessions.remove(user_id);
                true
            }
            Some(_) => {
                tracing::debug!(user_id, "session in use, not removed");
                false
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.sessions
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
