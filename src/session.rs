//! Per-session state: the current vector index and the running conversation.
//!
//! A [`Session`] is the explicit context object every user action receives by `&mut`. It is
//! either *Idle* (no index yet) or *Ready* (index built). [`SessionStore`] hands out
//! independently owned sessions keyed by id, so two users never see each other's documents or
//! history.

use crate::{
    chat::ChatMessage,
    conversation::{ConversationError, ConversationHistory, ConversationalPipeline},
    index::VectorIndex,
    processing::{DocumentProcessor, PdfSource, ProcessingError, ProcessingOutcome},
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use uuid::Uuid;

/// Observable phase of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionPhase {
    /// No documents processed yet.
    Idle,
    /// An index exists and questions can be answered.
    Ready,
}

/// One user's isolated interaction state.
#[derive(Debug, Default)]
pub struct Session {
    index: Option<VectorIndex>,
    history: ConversationHistory,
}

impl Session {
    /// Fresh session in the Idle phase.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current phase.
    pub fn phase(&self) -> SessionPhase {
        if self.index.is_some() {
            SessionPhase::Ready
        } else {
            SessionPhase::Idle
        }
    }

    /// Index built by the last successful processing action.
    pub fn index(&self) -> Option<&VectorIndex> {
        self.index.as_ref()
    }

    /// Conversation so far.
    pub fn history(&self) -> &ConversationHistory {
        &self.history
    }

    /// Process a batch of uploads and replace the session's index.
    ///
    /// An empty batch is rejected without touching the session. Otherwise the previous index is
    /// dropped before the rebuild starts, so a failure leaves the session Idle rather than
    /// answering from stale documents. History is kept.
    pub async fn process_documents(
        &mut self,
        processor: &DocumentProcessor,
        sources: Vec<PdfSource>,
    ) -> Result<ProcessingOutcome, ProcessingError> {
        if sources.is_empty() {
            return Err(ProcessingError::NoDocuments);
        }

        self.index = None;
        let (index, outcome) = processor.build_index(sources).await?;
        self.index = Some(index);
        Ok(outcome)
    }

    /// Replace the index with one built from already-extracted text.
    pub async fn process_text(
        &mut self,
        processor: &DocumentProcessor,
        text: &str,
    ) -> Result<ProcessingOutcome, ProcessingError> {
        self.index = None;
        let (index, outcome) = processor.build_index_from_text(text).await?;
        self.index = Some(index);
        Ok(outcome)
    }

    /// Answer a question and return the full updated history.
    ///
    /// While Idle this returns [`ConversationError::NotReady`] without contacting any service.
    pub async fn ask(
        &mut self,
        pipeline: &ConversationalPipeline,
        question: &str,
    ) -> Result<&ConversationHistory, ConversationError> {
        let Some(index) = self.index.as_ref() else {
            tracing::debug!("Question received before any documents were processed");
            return Err(ConversationError::NotReady);
        };

        let answer = pipeline.answer(index, &self.history, question).await?;
        self.history.push(question.trim(), answer);
        Ok(&self.history)
    }

    /// Rendered messages in chronological order.
    pub fn messages(&self) -> Vec<ChatMessage> {
        self.history.messages()
    }

    /// Return to a fresh Idle session with an empty history.
    pub fn reset(&mut self) {
        self.index = None;
        self.history.clear();
    }
}

/// Shared handle to a single session; the mutex serialises actions within that session.
pub type SessionHandle = Arc<Mutex<Session>>;

struct StoredSession {
    handle: SessionHandle,
    last_access: Instant,
}

/// Owns every live session.
///
/// Each lookup refreshes the session's last-access time; [`SessionStore::evict_idle`] drops
/// sessions that have not been touched within a time-to-live.
#[derive(Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<Uuid, StoredSession>>,
}

impl SessionStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new Idle session and return its id.
    pub async fn create(&self) -> Uuid {
        let id = Uuid::new_v4();
        self.sessions.write().await.insert(
            id,
            StoredSession {
                handle: Arc::new(Mutex::new(Session::new())),
                last_access: Instant::now(),
            },
        );
        tracing::info!(session = %id, "Session created");
        id
    }

    /// Look up a session by id and mark it as recently used.
    pub async fn get(&self, id: &Uuid) -> Option<SessionHandle> {
        let mut sessions = self.sessions.write().await;
        let stored = sessions.get_mut(id)?;
        stored.last_access = Instant::now();
        Some(stored.handle.clone())
    }

    /// Discard a session; returns false when it did not exist.
    pub async fn remove(&self, id: &Uuid) -> bool {
        let removed = self.sessions.write().await.remove(id).is_some();
        if removed {
            tracing::info!(session = %id, "Session discarded");
        }
        removed
    }

    /// Drop sessions idle for at least `ttl` and return how many were removed.
    ///
    /// A session whose lock is currently held is mid-action and is kept.
    pub async fn evict_idle(&self, ttl: Duration) -> usize {
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|id, stored| {
            let idle = now.duration_since(stored.last_access);
            let keep = idle < ttl || stored.handle.try_lock().is_err();
            if !keep {
                tracing::info!(session = %id, idle_secs = idle.as_secs(), "Session expired");
            }
            keep
        });
        before - sessions.len()
    }

    /// Number of live sessions.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// True when no session is live.
    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}
