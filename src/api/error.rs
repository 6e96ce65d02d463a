use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};

use crate::error::Error;

/// HTTP status a failure is reported with.
pub fn status_for(err: &Error) -> StatusCode {
    match err {
        Error::Auth(_) => StatusCode::UNAUTHORIZED,
        Error::Query { .. } => StatusCode::BAD_REQUEST,
        Error::Transport(e) if e.is_timeout() => StatusCode::GATEWAY_TIMEOUT,
        Error::Transport(_) | Error::Protocol(_) => StatusCode::BAD_GATEWAY,
        Error::Upstream { status, .. } => {
            StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
        }
        Error::Config(_) | Error::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// JSON error answer of the `/api` routes: `{"ok": false, "error": ...}`.
#[derive(Debug)]
pub struct ApiError(pub Error);

impl ApiError {
    pub fn not_signed_in() -> Self {
        Self(Error::Auth("not signed in".into()))
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        let mut body = json!({ "ok": false });
        match &self.0 {
            Error::Auth(message) => {
                body["error"] = Value::from(message.as_str());
                body["login"] = Value::from("/login");
            }
            Error::Query {
                message,
                error_code,
            } => {
                body["error"] = Value::from(message.as_str());
                body["errorCode"] = error_code.clone().map_or(Value::Null, Value::from);
            }
            Error::Upstream { body: upstream, .. } => {
                body["error"] = Value::from(upstream.as_str());
            }
            Error::Config(_) | Error::Io(_) => {
                body["error"] = Value::from("internal server error");
            }
            other => {
                body["error"] = Value::from(other.to_string());
            }
        }
        (status, Json(body)).into_response()
    }
}
