//! In-memory `ChatStore` backed by concurrent maps.
//!
//! Reference backend for tests and single-node deployments. Message order is
//! preserved by append order within each session vector.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

use crate::audit::AuditEntry;
use crate::chat::model::{ChatMessage, ChatSession, SessionStatus, Visitor, VisitorContact};

use super::error::{StorageError, StorageResult};
use super::{ChatStore, SessionQuery};

// ============================================================================
// MemoryStore
// ============================================================================

#[derive(Default)]
pub struct MemoryStore {
    visitors: DashMap<String, Visitor>,
    contacts: DashMap<String, VisitorContact>,
    sessions: DashMap<String, ChatSession>,
    /// session_token -> session id.
    token_index: DashMap<String, String>,
    /// session id -> ordered messages.
    messages: DashMap<String, Vec<ChatMessage>>,
    audit: Mutex<Vec<AuditEntry>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ChatStore for MemoryStore {
    // ========================================================================
    // Visitors
    // ========================================================================

    async fn upsert_visitor(&self, visitor: &Visitor) -> StorageResult<()> {
        self.visitors.insert(visitor.id.clone(), visitor.clone());
        Ok(())
    }

    async fn get_visitor(&self, visitor_id: &str) -> StorageResult<Option<Visitor>> {
        Ok(self.visitors.get(visitor_id).map(|v| v.clone()))
    }

    async fn save_contact(&self, contact: &VisitorContact) -> StorageResult<()> {
        self.contacts
            .insert(contact.visitor_id.clone(), contact.clone());
        Ok(())
    }

    // ========================================================================
    // Sessions
    // ========================================================================

    async fn insert_session(&self, session: &ChatSession) -> StorageResult<()> {
        if self.token_index.contains_key(&session.session_token) {
            return Err(StorageError::conflict(format!(
                "session token already in use: {}",
                session.session_token
            )));
        }
        self.token_index
            .insert(session.session_token.clone(), session.id.clone());
        self.sessions.insert(session.id.clone(), session.clone());
        Ok(())
    }

    async fn get_session(&self, session_id: &str) -> StorageResult<Option<ChatSession>> {
        Ok(self.sessions.get(session_id).map(|s| s.clone()))
    }

    async fn get_session_by_token(&self, token: &str) -> StorageResult<Option<ChatSession>> {
        let Some(id) = self.token_index.get(token).map(|id| id.clone()) else {
            return Ok(None);
        };
        self.get_session(&id).await
    }

    async fn update_session(&self, session: &ChatSession) -> StorageResult<()> {
        if !self.sessions.contains_key(&session.id) {
            return Err(StorageError::not_found("session", &session.id));
        }
        self.sessions.insert(session.id.clone(), session.clone());
        Ok(())
    }

    async fn list_sessions(&self, query: &SessionQuery) -> StorageResult<Vec<ChatSession>> {
        let mut sessions: Vec<ChatSession> = self
            .sessions
            .iter()
            .map(|entry| entry.value().clone())
            .filter(|s| !query.active_only || s.status.is_open())
            .filter(|s| query.status.is_none_or(|status| s.status == status))
            .collect();

        sessions.sort_by(|a, b| b.last_activity_at.cmp(&a.last_activity_at));

        let page: Vec<ChatSession> = match query.limit {
            Some(limit) => sessions.into_iter().skip(query.offset).take(limit).collect(),
            None => sessions.into_iter().skip(query.offset).collect(),
        };
        Ok(page)
    }

    async fn stale_active_sessions(
        &self,
        cutoff: DateTime<Utc>,
    ) -> StorageResult<Vec<ChatSession>> {
        Ok(self
            .sessions
            .iter()
            .map(|entry| entry.value().clone())
            .filter(|s| s.status == SessionStatus::Active && s.last_activity_at < cutoff)
            .collect())
    }

    // ========================================================================
    // Messages
    // ========================================================================

    async fn append_message(&self, message: &ChatMessage) -> StorageResult<()> {
        self.messages
            .entry(message.session_id.clone())
            .or_default()
            .push(message.clone());
        Ok(())
    }

    async fn list_messages(&self, session_id: &str) -> StorageResult<Vec<ChatMessage>> {
        Ok(self
            .messages
            .get(session_id)
            .map(|m| m.clone())
            .unwrap_or_default())
    }

    // ========================================================================
    // Audit
    // ========================================================================

    async fn append_audit(&self, entry: &AuditEntry) -> StorageResult<()> {
        self.audit
            .lock()
            .expect("mutex poisoned")
            .push(entry.clone());
        Ok(())
    }

    async fn list_audit(&self, limit: usize) -> StorageResult<Vec<AuditEntry>> {
        let audit = self.audit.lock().expect("mutex poisoned");
        Ok(audit.iter().rev().take(limit).cloned().collect())
    }
}

// ============================================================================
// Tests
// ============================================================================
