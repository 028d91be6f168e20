//! Chat storage seam.
//!
//! The state machine treats storage as a transactional document store keyed
//! by session identifiers. The production deployment backs this with a
//! relational database; the in-memory [`MemoryStore`] backs tests and
//! single-node setups. Any backend implements [`ChatStore`].

mod error;
mod memory;

pub use error::{StorageError, StorageResult};
pub use memory::MemoryStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::audit::AuditEntry;
use crate::chat::model::{ChatMessage, ChatSession, SessionStatus, Visitor, VisitorContact};

// ============================================================================
// SessionQuery
// ============================================================================

/// Listing filter for sessions. Results are ordered by `last_activity_at`
/// descending (most recently active first).
#[derive(Debug, Clone, Default)]
pub struct SessionQuery {
    /// Only sessions that still accept conversation (`Active`/`AdminActive`).
    pub active_only: bool,
    /// Exact status filter.
    pub status: Option<SessionStatus>,
    /// Page size; `None` means no limit.
    pub limit: Option<usize>,
    pub offset: usize,
}

// ============================================================================
// ChatStore
// ============================================================================

/// Storage interface for the chat takeover core.
///
/// Writes are last-write-wins at the record level; the narrow check-then-act
/// window on takeover status is accepted by design (takeover is a deliberate,
/// low-frequency action).
#[async_trait]
pub trait ChatStore: Send + Sync {
    // ========================================================================
    // Visitors
    // ========================================================================

    /// Insert or refresh a visitor record.
    async fn upsert_visitor(&self, visitor: &Visitor) -> StorageResult<()>;

    async fn get_visitor(&self, visitor_id: &str) -> StorageResult<Option<Visitor>>;

    /// Store the visitor's contact details (one record per visitor,
    /// overwritten on resubmission).
    async fn save_contact(&self, contact: &VisitorContact) -> StorageResult<()>;

    // ========================================================================
    // Sessions
    // ========================================================================

    /// Insert a new session. Fails with [`StorageError::Conflict`] if the
    /// session token is already in use.
    async fn insert_session(&self, session: &ChatSession) -> StorageResult<()>;

    async fn get_session(&self, session_id: &str) -> StorageResult<Option<ChatSession>>;

    async fn get_session_by_token(&self, token: &str) -> StorageResult<Option<ChatSession>>;

    /// Write back a full session record (last write wins).
    async fn update_session(&self, session: &ChatSession) -> StorageResult<()>;

    async fn list_sessions(&self, query: &SessionQuery) -> StorageResult<Vec<ChatSession>>;

    /// Sessions in `Active` status whose `last_activity_at` is older than
    /// `cutoff`. `AdminActive` sessions are never returned: a human is
    /// present, so they are exempt from abandonment.
    async fn stale_active_sessions(&self, cutoff: DateTime<Utc>)
    -> StorageResult<Vec<ChatSession>>;

    // ========================================================================
    // Messages (append-only)
    // ========================================================================

    async fn append_message(&self, message: &ChatMessage) -> StorageResult<()>;

    /// Messages for a session ordered by creation time, insertion order
    /// breaking ties.
    async fn list_messages(&self, session_id: &str) -> StorageResult<Vec<ChatMessage>>;

    // ========================================================================
    // Audit
    // ========================================================================

    async fn append_audit(&self, entry: &AuditEntry) -> StorageResult<()>;

    /// Most recent audit entries, newest first.
    async fn list_audit(&self, limit: usize) -> StorageResult<Vec<AuditEntry>>;
}
