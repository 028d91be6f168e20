//! Session state machine and message ingress.
//!
//! All lifecycle transitions (takeover, release, end, abandonment) and both
//! message entry points funnel through [`ChatService`]. The service persists
//! first and broadcasts second, so a notification never fires for a write
//! that failed.

use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{debug, info, warn};

use crate::audit::{AuditAction, AuditEntry};
use crate::broadcast::{ChatEvent, ChatEventKind, EventBroadcaster};
use crate::config::ChatConfig;
use crate::store::{ChatStore, SessionQuery, StorageError};

use super::error::{ChatError, ChatResult};
use super::model::{
    ChatMessage, ChatSession, MessageRole, SessionStatus, Visitor, VisitorContact,
};

// ============================================================================
// ChatService
// ============================================================================

/// Orchestrates session lifecycle, message ingress, and event fan-out.
///
/// Cheap to clone; one instance is shared across all HTTP handlers and the
/// abandonment sweeper.
#[derive(Clone)]
pub struct ChatService {
    store: Arc<dyn ChatStore>,
    broadcaster: EventBroadcaster,
    config: ChatConfig,
}

impl ChatService {
    pub fn new(store: Arc<dyn ChatStore>, broadcaster: EventBroadcaster, config: ChatConfig) -> Self {
        Self {
            store,
            broadcaster,
            config,
        }
    }

    pub fn broadcaster(&self) -> &EventBroadcaster {
        &self.broadcaster
    }

    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    // ========================================================================
    // Visitor ingress
    // ========================================================================

    /// Record an inbound visitor message.
    ///
    /// Finds the session by its opaque token, creating one (and the visitor
    /// record) on first contact. An `Abandoned` session reopens to `Active`:
    /// a new message is renewed activity. An `Ended` session rejects further
    /// messages.
    ///
    /// Persistence only; generating the assistant's reply is the caller's
    /// concern and happens outside this crate.
    pub async fn record_visitor_message(
        &self,
        session_token: &str,
        content: &str,
        current_page: Option<String>,
        locale: Option<String>,
        remote_addr: Option<String>,
    ) -> ChatResult<(ChatSession, ChatMessage)> {
        self.validate_content(content)?;

        let mut session = match self.store.get_session_by_token(session_token).await? {
            Some(existing) => existing,
            None => {
                self.start_session(session_token, current_page.clone(), locale.clone(), remote_addr)
                    .await?
            }
        };

        match session.status {
            SessionStatus::Ended => {
                return Err(ChatError::InvalidTransition {
                    status: session.status,
                    action: "post a message to",
                });
            }
            SessionStatus::Abandoned => {
                // Renewed activity reopens the session.
                info!(session_id = %session.id, "Reopening abandoned session on new message");
                session.status = SessionStatus::Active;
            }
            SessionStatus::Active | SessionStatus::AdminActive => {}
        }

        if let Some(page) = current_page {
            session.current_page = Some(page);
        }
        if let Some(locale) = locale {
            session.locale = Some(locale);
        }
        session.touch();
        self.store.update_session(&session).await?;

        let message = ChatMessage::new(&session.id, MessageRole::User, content);
        self.store.append_message(&message).await?;

        self.broadcast_for(
            &session,
            ChatEventKind::NewMessage {
                message: message.clone(),
            },
        );

        Ok((session, message))
    }

    /// Store the visitor's contact details against their current session's
    /// visitor record and notify admin listeners.
    pub async fn collect_contact(
        &self,
        session_token: &str,
        name: &str,
        email: Option<String>,
        phone: Option<String>,
    ) -> ChatResult<VisitorContact> {
        let session = self.session_by_token(session_token).await?;

        let contact = VisitorContact {
            visitor_id: session.visitor_id.clone(),
            name: name.to_string(),
            email,
            phone,
            created_at: Utc::now(),
        };
        self.store.save_contact(&contact).await?;

        self.broadcast_for(
            &session,
            ChatEventKind::ContactCollected {
                contact: contact.clone(),
            },
        );
        Ok(contact)
    }

    // ========================================================================
    // Admin ingress
    // ========================================================================

    /// Post an admin reply into a session.
    ///
    /// The session must currently be under admin takeover; the check-then-act
    /// window against a concurrent release is accepted (takeover is a
    /// deliberate, low-frequency action, last write wins at the store).
    pub async fn send_admin_message(
        &self,
        session_id: &str,
        admin_id: &str,
        content: &str,
    ) -> ChatResult<ChatMessage> {
        self.validate_content(content)?;

        let mut session = self.session_by_id(session_id).await?;
        if !session.is_admin_takeover {
            return Err(ChatError::TakeoverRequired);
        }

        let message = ChatMessage::new(&session.id, MessageRole::Admin, content)
            .with_metadata(serde_json::json!({ "admin_id": admin_id }));
        self.store.append_message(&message).await?;

        session.touch();
        self.store.update_session(&session).await?;

        self.broadcast_for(
            &session,
            ChatEventKind::NewMessage {
                message: message.clone(),
            },
        );

        debug!(session_id = %session.id, admin_id, "Admin message recorded");
        Ok(message)
    }

    // ========================================================================
    // Lifecycle transitions
    // ========================================================================

    /// `Active -> AdminActive`: a human admin takes exclusive control.
    ///
    /// Appends a system message announcing the takeover and notifies both the
    /// admin and visitor channels.
    pub async fn take_over(&self, session_id: &str, admin_id: &str) -> ChatResult<ChatSession> {
        let mut session = self.session_by_id(session_id).await?;
        if session.status != SessionStatus::Active {
            return Err(ChatError::InvalidTransition {
                status: session.status,
                action: "take over",
            });
        }

        session.status = SessionStatus::AdminActive;
        session.is_admin_takeover = true;
        session.admin_takeover_by = Some(admin_id.to_string());
        session.touch();
        self.store.update_session(&session).await?;

        let notice = ChatMessage::new(
            &session.id,
            MessageRole::System,
            "An agent has joined the conversation",
        );
        self.store.append_message(&notice).await?;

        self.broadcast_for(
            &session,
            ChatEventKind::AdminJoined {
                admin_id: admin_id.to_string(),
            },
        );

        info!(session_id = %session.id, admin_id, "Admin takeover");
        Ok(session)
    }

    /// `AdminActive -> Active`: hand the conversation back to the assistant.
    pub async fn release(&self, session_id: &str, admin_id: &str) -> ChatResult<ChatSession> {
        let mut session = self.session_by_id(session_id).await?;
        if session.status != SessionStatus::AdminActive {
            return Err(ChatError::InvalidTransition {
                status: session.status,
                action: "release",
            });
        }

        session.status = SessionStatus::Active;
        session.is_admin_takeover = false;
        session.admin_takeover_by = None;
        session.touch();
        self.store.update_session(&session).await?;

        let notice = ChatMessage::new(
            &session.id,
            MessageRole::System,
            "The agent has left the conversation",
        );
        self.store.append_message(&notice).await?;

        self.broadcast_for(&session, ChatEventKind::AdminLeft);

        info!(session_id = %session.id, admin_id, "Admin released session");
        Ok(session)
    }

    /// `(Active|AdminActive) -> Ended`: explicit admin termination.
    pub async fn end_session(&self, session_id: &str, admin_id: &str) -> ChatResult<ChatSession> {
        let mut session = self.session_by_id(session_id).await?;
        if !session.status.is_open() {
            return Err(ChatError::InvalidTransition {
                status: session.status,
                action: "end",
            });
        }

        session.status = SessionStatus::Ended;
        session.is_admin_takeover = false;
        session.admin_takeover_by = None;
        session.ended_at = Some(Utc::now());
        self.store.update_session(&session).await?;

        self.broadcast_for(&session, ChatEventKind::SessionEnded);

        info!(session_id = %session.id, admin_id, "Session ended");
        Ok(session)
    }

    /// Transition stale `Active` sessions to `Abandoned`.
    ///
    /// `AdminActive` sessions are exempt regardless of staleness. Returns the
    /// number of sessions swept.
    pub async fn sweep_abandoned(&self) -> ChatResult<usize> {
        let cutoff = Utc::now() - Duration::minutes(self.config.abandon_after_minutes as i64);
        let stale = self.store.stale_active_sessions(cutoff).await?;
        let mut swept = 0;

        for mut session in stale {
            session.status = SessionStatus::Abandoned;
            if let Err(e) = self.store.update_session(&session).await {
                warn!(session_id = %session.id, error = %e, "Failed to mark session abandoned");
                continue;
            }
            swept += 1;
        }

        if swept > 0 {
            info!(count = swept, "Marked inactive sessions abandoned");
        }
        Ok(swept)
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub async fn get_session(&self, session_id: &str) -> ChatResult<ChatSession> {
        self.session_by_id(session_id).await
    }

    pub async fn list_sessions(&self, query: &SessionQuery) -> ChatResult<Vec<ChatSession>> {
        Ok(self.store.list_sessions(query).await?)
    }

    pub async fn list_messages(&self, session_id: &str) -> ChatResult<Vec<ChatMessage>> {
        // 404 for unknown sessions rather than an empty list.
        self.session_by_id(session_id).await?;
        Ok(self.store.list_messages(session_id).await?)
    }

    // ========================================================================
    // Audit
    // ========================================================================

    /// Record an admin action in the audit trail. Audit failures are logged
    /// and swallowed: they must not fail the action that already happened.
    pub async fn record_audit(
        &self,
        admin_id: &str,
        action: AuditAction,
        target: &str,
        remote_addr: Option<String>,
        user_agent: Option<String>,
    ) {
        let entry =
            AuditEntry::new(admin_id, action, target).with_request_meta(remote_addr, user_agent);
        if let Err(e) = self.store.append_audit(&entry).await {
            warn!(target, error = %e, "Failed to record audit entry");
        }
    }

    pub async fn list_audit(&self, limit: usize) -> ChatResult<Vec<AuditEntry>> {
        Ok(self.store.list_audit(limit).await?)
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn validate_content(&self, content: &str) -> ChatResult<()> {
        let length = content.chars().count();
        if length == 0 || length > self.config.max_message_length {
            return Err(ChatError::InvalidContent {
                max: self.config.max_message_length,
            });
        }
        Ok(())
    }

    async fn session_by_id(&self, session_id: &str) -> ChatResult<ChatSession> {
        self.store
            .get_session(session_id)
            .await?
            .ok_or_else(|| ChatError::SessionNotFound(session_id.to_string()))
    }

    async fn session_by_token(&self, token: &str) -> ChatResult<ChatSession> {
        self.store
            .get_session_by_token(token)
            .await?
            .ok_or_else(|| ChatError::SessionNotFound(token.to_string()))
    }

    /// Create the session (and the visitor on first contact) for a new token.
    async fn start_session(
        &self,
        session_token: &str,
        current_page: Option<String>,
        locale: Option<String>,
        remote_addr: Option<String>,
    ) -> ChatResult<ChatSession> {
        let visitor = Visitor::new(format!("vis_{}", ulid::Ulid::new()), remote_addr);
        self.store.upsert_visitor(&visitor).await?;

        let session = ChatSession::new(&visitor.id, session_token, current_page, locale);
        match self.store.insert_session(&session).await {
            Ok(()) => {}
            // Lost a race with a concurrent first message for the same token;
            // use whichever session won.
            Err(StorageError::Conflict(_)) => {
                return self.session_by_token(session_token).await;
            }
            Err(e) => return Err(e.into()),
        }

        self.broadcast_for(
            &session,
            ChatEventKind::SessionStarted {
                visitor_id: session.visitor_id.clone(),
                current_page: session.current_page.clone(),
                locale: session.locale.clone(),
            },
        );

        info!(session_id = %session.id, "Chat session started");
        Ok(session)
    }

    /// Broadcast to the session-id channel plus the token channel, so both
    /// admin and visitor streams see the event.
    fn broadcast_for(&self, session: &ChatSession, kind: ChatEventKind) {
        self.broadcaster.broadcast(
            ChatEvent::new(&session.id, kind),
            &[session.session_token.as_str()],
        );
    }
}

// ============================================================================
// Tests
// ============================================================================
