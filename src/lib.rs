//! Chatrelay - live visitor chat with human takeover of an AI-handled conversation.
//!
//! The core of the crate is the takeover protocol: a chat session is normally
//! answered by an AI assistant, and an admin can take exclusive control of the
//! conversation, post replies, and hand it back. State transitions live in
//! [`chat::ChatService`]; change notifications fan out through the in-process
//! [`broadcast::EventBroadcaster`] and reach the admin dashboard and the
//! visitor widget over SSE push streams.

// ============================================================================
// Core Infrastructure
// ============================================================================

pub mod background;
pub mod build_info;
pub mod config;
pub mod store;

// ============================================================================
// Domain
// ============================================================================

pub mod audit;
pub mod broadcast;
pub mod chat;

// ============================================================================
// Server & HTTP
// ============================================================================

pub mod api;
pub mod handlers;
pub mod server;
