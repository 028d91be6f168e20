//! Chat event types carried by the broadcaster.
//!
//! Events are transient notifications: produced synchronously whenever the
//! state machine or message ingress performs a state-affecting action,
//! consumed by zero or more subscribers, then discarded. Durable state lives
//! in the store, not here.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::chat::model::{ChatMessage, VisitorContact};

/// Reserved channel receiving every event, used by admin dashboards that
/// want a live feed of all sessions.
pub const ALL_CHANNEL: &str = "all";

// ============================================================================
// ChatEvent
// ============================================================================

/// A transient chat notification. No replay, no delivery guarantee across
/// process restarts.
#[derive(Debug, Clone, Serialize)]
pub struct ChatEvent {
    pub session_id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub kind: ChatEventKind,
}

/// Event payloads, one variant per notification kind.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatEventKind {
    /// A message was appended to the session.
    NewMessage { message: ChatMessage },
    /// A new session started (admin-only).
    SessionStarted {
        visitor_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        current_page: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        locale: Option<String>,
    },
    /// The session was ended by an admin (admin-only).
    SessionEnded,
    /// A human admin took control of the conversation.
    AdminJoined { admin_id: String },
    /// The admin released the conversation back to the AI.
    AdminLeft,
    /// The visitor left contact details (admin-only).
    ContactCollected { contact: VisitorContact },
}

impl ChatEvent {
    /// Create an event stamped with the current time.
    #[must_use]
    pub fn new(session_id: impl Into<String>, kind: ChatEventKind) -> Self {
        Self {
            session_id: session_id.into(),
            timestamp: Utc::now(),
            kind,
        }
    }

    /// Event type name as it appears on the wire.
    pub fn event_type(&self) -> &'static str {
        match self.kind {
            ChatEventKind::NewMessage { .. } => "new_message",
            ChatEventKind::SessionStarted { .. } => "session_started",
            ChatEventKind::SessionEnded => "session_ended",
            ChatEventKind::AdminJoined { .. } => "admin_joined",
            ChatEventKind::AdminLeft => "admin_left",
            ChatEventKind::ContactCollected { .. } => "contact_collected",
        }
    }

    /// Whether the visitor-facing stream may forward this event.
    ///
    /// Session-management events are admin-only and must not leak to the
    /// widget.
    pub fn visitor_visible(&self) -> bool {
        matches!(
            self.kind,
            ChatEventKind::NewMessage { .. }
                | ChatEventKind::AdminJoined { .. }
                | ChatEventKind::AdminLeft
        )
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::model::MessageRole;

    #[test]
    fn serializes_with_type_tag() {
        let event = ChatEvent::new(
            "chs_1",
            ChatEventKind::AdminJoined {
                admin_id: "admin-1".to_string(),
            },
        );

        let json: serde_json::Value =
            serde_json::from_str(&serde_json::to_string(&event).unwrap()).unwrap();
        assert_eq!(json["type"], "admin_joined");
        assert_eq!(json["session_id"], "chs_1");
        assert_eq!(json["admin_id"], "admin-1");
        assert!(json.get("timestamp").is_some());
    }

    #[test]
    fn new_message_carries_full_payload() {
        let message = ChatMessage::new("chs_1", MessageRole::Admin, "Hello");
        let event = ChatEvent::new("chs_1", ChatEventKind::NewMessage { message });

        let json: serde_json::Value =
            serde_json::from_str(&serde_json::to_string(&event).unwrap()).unwrap();
        assert_eq!(json["type"], "new_message");
        assert_eq!(json["message"]["content"], "Hello");
        assert_eq!(json["message"]["role"], "admin");
    }

    #[test]
    fn visitor_visibility_filter() {
        let message = ChatMessage::new("chs_1", MessageRole::User, "hi");
        let visible = [
            ChatEventKind::NewMessage { message },
            ChatEventKind::AdminJoined {
                admin_id: "a".to_string(),
            },
            ChatEventKind::AdminLeft,
        ];
        for kind in visible {
            assert!(ChatEvent::new("chs_1", kind).visitor_visible());
        }

        let hidden = [
            ChatEventKind::SessionStarted {
                visitor_id: "v".to_string(),
                current_page: None,
                locale: None,
            },
            ChatEventKind::SessionEnded,
        ];
        for kind in hidden {
            assert!(!ChatEvent::new("chs_1", kind).visitor_visible());
        }
    }
}
