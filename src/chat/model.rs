//! Persistent chat entities: visitors, sessions, and messages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Prefix for generated message IDs.
pub const MESSAGE_ID_PREFIX: &str = "msg_";
/// Prefix for generated session IDs.
pub const SESSION_ID_PREFIX: &str = "chs_";

// ============================================================================
// SessionStatus
// ============================================================================

/// Lifecycle state of a chat session.
///
/// `Active` means the AI assistant is the responder; `AdminActive` means a
/// human admin has taken exclusive control. `Ended` is terminal. `Abandoned`
/// sessions reopen to `Active` when the visitor sends a new message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
    AdminActive,
    Ended,
    Abandoned,
}

impl SessionStatus {
    /// Whether the session still accepts conversation (admin dashboards list
    /// these as "active").
    pub fn is_open(self) -> bool {
        matches!(self, Self::Active | Self::AdminActive)
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Active => "active",
            Self::AdminActive => "admin_active",
            Self::Ended => "ended",
            Self::Abandoned => "abandoned",
        };
        f.write_str(s)
    }
}

// ============================================================================
// MessageRole
// ============================================================================

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    User,
    Assistant,
    Admin,
    System,
}

// ============================================================================
// Visitor
// ============================================================================

/// A long-lived visitor identity keyed by a client-generated token.
///
/// Created on first contact, never deleted automatically.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Visitor {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_addr: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
}

impl Visitor {
    #[must_use]
    pub fn new(id: impl Into<String>, remote_addr: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            remote_addr,
            created_at: now,
            last_seen_at: now,
        }
    }
}

// ============================================================================
// VisitorContact
// ============================================================================

/// Lead details a visitor left through the chat widget.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisitorContact {
    pub visitor_id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// ChatSession
// ============================================================================

/// One conversation between a visitor and the system.
///
/// The `session_token` is the opaque capability visitors hold; internal
/// session IDs never leave the admin surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSession {
    pub id: String,
    pub visitor_id: String,
    pub session_token: String,
    pub status: SessionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_page: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
    /// Redundant with `status == AdminActive` but cheaper to check on the
    /// message ingress hot path.
    pub is_admin_takeover: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_takeover_by: Option<String>,
    pub started_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
}

impl ChatSession {
    /// Create a new session in the initial `Active` state.
    #[must_use]
    pub fn new(
        visitor_id: impl Into<String>,
        session_token: impl Into<String>,
        current_page: Option<String>,
        locale: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: format!("{}{}", SESSION_ID_PREFIX, Ulid::new()),
            visitor_id: visitor_id.into(),
            session_token: session_token.into(),
            status: SessionStatus::Active,
            current_page,
            locale,
            is_admin_takeover: false,
            admin_takeover_by: None,
            started_at: now,
            last_activity_at: now,
            ended_at: None,
        }
    }

    /// Record activity on the session.
    pub fn touch(&mut self) {
        self.last_activity_at = Utc::now();
    }

    /// Invariant check: `is_admin_takeover` holds exactly while the session
    /// is under admin control.
    pub fn takeover_consistent(&self) -> bool {
        self.is_admin_takeover == (self.status == SessionStatus::AdminActive)
    }
}

// ============================================================================
// ChatMessage
// ============================================================================

/// An append-only entry under a session. Messages are never mutated or
/// deleted; ordering is by creation time, ties broken by insertion order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub session_id: String,
    pub role: MessageRole,
    pub content: String,
    /// Opaque structured payload, e.g. `{"admin_id": "..."}`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    #[must_use]
    pub fn new(session_id: impl Into<String>, role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            id: format!("{}{}", MESSAGE_ID_PREFIX, Ulid::new()),
            session_id: session_id.into(),
            role,
            content: content.into(),
            metadata: None,
            created_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

// ============================================================================
// Tests
// ============================================================================
