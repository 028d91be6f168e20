//! Wire types for the HTTP API.

use serde::{Deserialize, Serialize};

use crate::chat::model::{ChatMessage, ChatSession, SessionStatus};

// ============================================================================
// Visitor API
// ============================================================================

/// POST /api/v1/chat/messages
#[derive(Debug, Deserialize)]
pub struct VisitorMessageRequest {
    pub session_token: String,
    pub content: String,
    #[serde(default)]
    pub current_page: Option<String>,
    #[serde(default)]
    pub locale: Option<String>,
}

/// Response for visitor message ingress. Deliberately omits the internal
/// session ID; the token is the only session handle visitors hold.
#[derive(Debug, Serialize)]
pub struct VisitorMessageResponse {
    pub message_id: String,
    pub created_at: String,
}

/// POST /api/v1/chat/visitor/contact
#[derive(Debug, Deserialize)]
pub struct ContactRequest {
    pub session_token: String,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

// ============================================================================
// Admin API
// ============================================================================

/// POST /api/v1/chat/sessions/{session_id}/messages
#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct ListSessionsQuery {
    /// `active=true` restricts to sessions that still accept conversation.
    #[serde(default)]
    pub active: Option<bool>,
    #[serde(default)]
    pub status: Option<SessionStatus>,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub offset: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct ListSessionsResponse {
    pub sessions: Vec<ChatSession>,
}

#[derive(Debug, Serialize)]
pub struct GetMessagesResponse {
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Deserialize)]
pub struct AuditQuery {
    #[serde(default = "default_audit_limit")]
    pub limit: usize,
}

fn default_audit_limit() -> usize {
    100
}

// ============================================================================
// Stream query parameters
// ============================================================================

/// GET /api/v1/chat/stream
#[derive(Debug, Deserialize)]
pub struct AdminStreamQuery {
    #[serde(default)]
    pub session_id: Option<String>,
}

/// GET /api/v1/chat/visitor/stream
#[derive(Debug, Deserialize)]
pub struct VisitorStreamQuery {
    #[serde(default)]
    pub session_token: Option<String>,
}
