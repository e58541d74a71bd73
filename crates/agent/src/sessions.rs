use std::collections::HashMap;
use std::time::{Duration, Instant};

use chowbot_core::dialogue::{
    DialogueDefinition, DialogueEngine, DialogueSession, DialogueTransitionError,
    TransitionOutcome,
};
use chowbot_core::domain::message::ConversationKey;
use tokio::sync::Mutex;

#[derive(Debug)]
struct SessionEntry {
    session: DialogueSession,
    touched_at: Instant,
}

/// Active dialogues keyed by channel and user.
///
/// Only non-terminal sessions are stored. Each transition happens inside one
/// short critical section, so connector and search calls never run under the lock.
#[derive(Debug)]
pub struct SessionStore {
    idle_timeout: Duration,
    sessions: Mutex<HashMap<ConversationKey, SessionEntry>>,
}

impl SessionStore {
    pub fn new(idle_timeout: Duration) -> Self {
        Self { idle_timeout, sessions: Mutex::new(HashMap::new()) }
    }

    /// Stores a fresh session, replacing whatever the key held before.
    pub async fn begin(&self, key: ConversationKey, session: DialogueSession) {
        if !session.is_active() {
            return;
        }
        let mut sessions = self.sessions.lock().await;
        sessions.insert(key, SessionEntry { session, touched_at: Instant::now() });
    }

    /// Feeds `input` to the session open for `key`.
    ///
    /// Returns `None` when no live session exists. Expired sessions are dropped here.
    pub async fn advance<F>(
        &self,
        key: &ConversationKey,
        engine: &DialogueEngine<F>,
        input: &str,
    ) -> Option<Result<TransitionOutcome, DialogueTransitionError>>
    where
        F: DialogueDefinition,
    {
        let mut sessions = self.sessions.lock().await;
        let entry = sessions.remove(key)?;

        if entry.touched_at.elapsed() >= self.idle_timeout {
            tracing::debug!(
                event_name = "dialogue.session.expired",
                conversation = %key,
                session_id = %entry.session.id,
                "dropping idle dialogue session"
            );
            return None;
        }

        let result = engine.advance(&entry.session, input);
        if let Ok(outcome) = &result {
            if outcome.session.is_active() {
                sessions.insert(
                    key.clone(),
                    SessionEntry { session: outcome.session.clone(), touched_at: Instant::now() },
                );
            }
        }

        Some(result)
    }

    pub async fn get(&self, key: &ConversationKey) -> Option<DialogueSession> {
        let sessions = self.sessions.lock().await;
        sessions
            .get(key)
            .filter(|entry| entry.touched_at.elapsed() < self.idle_timeout)
            .map(|entry| entry.session.clone())
    }

    pub async fn active_count(&self) -> usize {
        let sessions = self.sessions.lock().await;
        sessions.values().filter(|entry| entry.touched_at.elapsed() < self.idle_timeout).count()
    }

    /// Removes every expired session and returns how many were dropped.
    pub async fn purge_expired(&self) -> usize {
        let mut sessions = self.sessions.lock().await;
        let before = sessions.len();
        sessions.retain(|_, entry| entry.touched_at.elapsed() < self.idle_timeout);
        before - sessions.len()
    }
}
