//! Chat domain: session state machine, message ingress, and the
//! abandonment sweeper.

pub mod error;
pub mod model;
pub mod service;
pub mod sweeper;

pub use error::{ChatError, ChatResult};
pub use model::{
    ChatMessage, ChatSession, MessageRole, SessionStatus, Visitor, VisitorContact,
};
pub use service::ChatService;
pub use sweeper::spawn_sweeper;
