//! RFC 7807 problem detail responses.
//!
//! All error responses use `application/problem+json` so clients get a
//! uniform shape regardless of which handler rejected them.

use axum::Json;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub(crate) struct ProblemDetails {
    #[serde(rename = "type")]
    problem_type: &'static str,
    title: &'static str,
    status: u16,
    detail: String,
}

pub(crate) struct Problem {
    status: StatusCode,
    body: ProblemDetails,
}

impl IntoResponse for Problem {
    fn into_response(self) -> Response {
        (
            self.status,
            [(header::CONTENT_TYPE, "application/problem+json")],
            Json(self.body),
        )
            .into_response()
    }
}

fn problem(status: StatusCode, title: &'static str, detail: impl Into<String>) -> Problem {
    Problem {
        status,
        body: ProblemDetails {
            problem_type: "about:blank",
            title,
            status: status.as_u16(),
            detail: detail.into(),
        },
    }
}

pub(crate) fn bad_request(detail: impl Into<String>) -> Problem {
    problem(StatusCode::BAD_REQUEST, "Bad Request", detail)
}

pub(crate) fn not_found(detail: impl Into<String>) -> Problem {
    problem(StatusCode::NOT_FOUND, "Not Found", detail)
}

pub(crate) fn conflict(detail: impl Into<String>) -> Problem {
    problem(StatusCode::CONFLICT, "Conflict", detail)
}

pub(crate) fn internal_error(detail: impl Into<String>) -> Problem {
    problem(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error", detail)
}
