//! Maps the workspace [`cairn_error::Error`] taxonomy onto HTTP responses (spec §7).
//!
//! Most variants get one fixed status; `SessionNotFound` is the exception — session CRUD
//! endpoints report it as 404 ("never heard of this session"), while `POST /chat` reports
//! it as 410 ("this session existed but is gone now"), per spec §6's distinction between a
//! bad session id and a session that expired mid-request. `ApiError` carries that choice
//! explicitly rather than re-deriving it from the route.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

#[derive(Serialize)]
struct ErrorBody {
    kind: &'static str,
    message: String,
}

/// Wraps a [`cairn_error::Error`] with the status it should carry for the endpoint that
/// produced it.
pub struct ApiError {
    status: StatusCode,
    inner: cairn_error::Error,
}

impl ApiError {
    /// Session CRUD endpoints: unknown/expired session is 404.
    pub fn sessions(inner: cairn_error::Error) -> Self {
        let status = default_status(&inner);
        Self { status, inner }
    }

    /// `POST /chat`: a session that vanished mid-request is 410, not 404.
    pub fn chat(inner: cairn_error::Error) -> Self {
        let status = match inner {
            cairn_error::Error::SessionNotFound(_) => StatusCode::GONE,
            _ => default_status(&inner),
        };
        Self { status, inner }
    }
}

fn default_status(err: &cairn_error::Error) -> StatusCode {
    match err {
        cairn_error::Error::SessionNotFound(_) => StatusCode::NOT_FOUND,
        cairn_error::Error::RetrievalBackendFailure(_) => StatusCode::BAD_GATEWAY,
        cairn_error::Error::GenerationBackendFailure(_) => StatusCode::BAD_GATEWAY,
        cairn_error::Error::StructuredResponseMalformed(_) => StatusCode::BAD_GATEWAY,
        cairn_error::Error::DeadlineExceeded => StatusCode::GATEWAY_TIMEOUT,
        cairn_error::Error::ConfigurationInvalid(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody { kind: self.inner.kind(), message: self.inner.to_string() };
        (self.status, Json(body)).into_response()
    }
}
