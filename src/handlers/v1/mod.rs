//! V1 API handlers.

mod sessions;
mod streams;
mod visitor;

pub use sessions::{
    end_session, get_messages, get_session, list_audit, list_sessions, release, send_message,
    take_over,
};
pub use streams::admin_stream;
pub use visitor::{collect_contact, send_visitor_message, visitor_stream};

use axum::response::{IntoResponse, Response};
use tracing::error;

use super::problem_details;
use crate::chat::ChatError;

/// Map a chat-core error to its HTTP representation.
///
/// Validation and precondition failures are 400 (the admin UI shows them as
/// actionable messages), unknown sessions 404, illegal lifecycle transitions
/// 409, store failures 500.
fn error_response(err: ChatError) -> Response {
    match err {
        ChatError::SessionNotFound(_) => {
            problem_details::not_found("chat session not found").into_response()
        }
        ChatError::InvalidContent { max } => problem_details::bad_request(format!(
            "message content must be between 1 and {max} characters"
        ))
        .into_response(),
        ChatError::TakeoverRequired => {
            problem_details::bad_request("take over the session before sending messages")
                .into_response()
        }
        ChatError::InvalidTransition { status, action } => {
            problem_details::conflict(format!("cannot {action} a session in status '{status}'"))
                .into_response()
        }
        ChatError::Storage(e) => {
            error!(error = %e, "storage failure");
            problem_details::internal_error("storage failure").into_response()
        }
    }
}
