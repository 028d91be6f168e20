//! Audit trail for admin actions on chat sessions.
//!
//! Takeover, release, and end-session are deliberate, exclusive actions;
//! each one is recorded with actor, target, and request metadata.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

// ============================================================================
// AuditAction
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Takeover,
    Release,
    EndSession,
}

// ============================================================================
// AuditEntry
// ============================================================================

/// One recorded admin action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: String,
    pub admin_id: String,
    pub action: AuditAction,
    /// Session ID the action applied to.
    pub target: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_addr: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

impl AuditEntry {
    #[must_use]
    pub fn new(admin_id: impl Into<String>, action: AuditAction, target: impl Into<String>) -> Self {
        Self {
            id: format!("aud_{}", Ulid::new()),
            admin_id: admin_id.into(),
            action,
            target: target.into(),
            timestamp: Utc::now(),
            remote_addr: None,
            user_agent: None,
        }
    }

    #[must_use]
    pub fn with_request_meta(
        mut self,
        remote_addr: Option<String>,
        user_agent: Option<String>,
    ) -> Self {
        self.remote_addr = remote_addr;
        self.user_agent = user_agent;
        self
    }
}
